//! Structured logging for lifecycle operations
//!
//! Every lifecycle operation logs exactly one outcome event. Logs are
//! synchronous JSON lines with deterministic field ordering so operators can
//! diff runs and machines can parse them without a schema.

mod logger;

pub use logger::{Logger, Severity};
