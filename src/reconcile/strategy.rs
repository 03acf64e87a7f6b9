//! Transfer strategies
//!
//! Every reconciliation call names its strategy explicitly; there is no
//! default. Matching is always by natural key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStrategy {
    /// Matched rows are overwritten with the source payload
    Replace,
    /// Matched rows are overwritten only when the payloads differ
    Merge,
    /// Matched rows are left untouched
    SkipExisting,
}

impl TransferStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStrategy::Replace => "replace",
            TransferStrategy::Merge => "merge",
            TransferStrategy::SkipExisting => "skip_existing",
        }
    }
}

impl fmt::Display for TransferStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transfer strategy: {0}")]
pub struct UnknownStrategy(pub String);

impl FromStr for TransferStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace" => Ok(TransferStrategy::Replace),
            "merge" => Ok(TransferStrategy::Merge),
            "skip_existing" => Ok(TransferStrategy::SkipExisting),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}
