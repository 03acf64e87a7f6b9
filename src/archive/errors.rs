//! Archive-store error types
//!
//! Archive errors follow the platform error model:
//! - Structured error codes in UV_CATEGORY_NAME format
//! - Clear severity levels
//! - No silent failures
//!
//! All archive errors are ERROR severity. An archive failure never corrupts
//! the schema it snapshotted.

use std::fmt;
use std::io;

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation failed but the system is healthy
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Archive error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveErrorCode {
    /// The schema to snapshot does not exist
    UvArchiveSourceMissing,
    /// I/O failure while writing the archive or its index
    UvArchiveWrite,
    /// Unknown archive id
    UvArchiveNotFound,
    /// Remote store unreachable or failed
    UvArchiveRemote,
    /// Payload checksum mismatch
    UvArchiveChecksum,
}

impl ArchiveErrorCode {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveErrorCode::UvArchiveSourceMissing => "UV_ARCHIVE_SOURCE_MISSING",
            ArchiveErrorCode::UvArchiveWrite => "UV_ARCHIVE_WRITE",
            ArchiveErrorCode::UvArchiveNotFound => "UV_ARCHIVE_NOT_FOUND",
            ArchiveErrorCode::UvArchiveRemote => "UV_ARCHIVE_REMOTE",
            ArchiveErrorCode::UvArchiveChecksum => "UV_ARCHIVE_CHECKSUM",
        }
    }

    /// Returns the severity level for this error code
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for ArchiveErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Archive error with full context
#[derive(Debug)]
pub struct ArchiveError {
    code: ArchiveErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl ArchiveError {
    fn new(code: ArchiveErrorCode, message: impl Into<String>, source: Option<io::Error>) -> Self {
        Self {
            code,
            message: message.into(),
            source,
        }
    }

    /// The schema to snapshot does not exist
    pub fn source_schema_not_found(message: impl Into<String>) -> Self {
        Self::new(ArchiveErrorCode::UvArchiveSourceMissing, message, None)
    }

    /// Write failure; no partial archive is left registered
    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::new(ArchiveErrorCode::UvArchiveWrite, message, None)
    }

    /// Write failure with underlying I/O error
    pub fn write_failed_with_source(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(ArchiveErrorCode::UvArchiveWrite, message, Some(source))
    }

    /// I/O error at a specific path
    pub fn io_error_at_path(path: &std::path::Path, source: io::Error) -> Self {
        Self::write_failed_with_source(format!("I/O error at {}", path.display()), source)
    }

    /// Unknown archive id
    pub fn not_found(archive_id: &str) -> Self {
        Self::new(
            ArchiveErrorCode::UvArchiveNotFound,
            format!("archive not found: {}", archive_id),
            None,
        )
    }

    /// Remote store failure; the local copy is untouched
    pub fn remote_unavailable(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(ArchiveErrorCode::UvArchiveRemote, message, Some(source))
    }

    /// Payload checksum mismatch
    pub fn checksum_mismatch(archive_id: &str, expected: &str, actual: &str) -> Self {
        Self::new(
            ArchiveErrorCode::UvArchiveChecksum,
            format!(
                "archive {} checksum mismatch: expected {}, got {}",
                archive_id, expected, actual
            ),
            None,
        )
    }

    /// Returns the error code
    pub fn code(&self) -> ArchiveErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the severity of this error
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Archive errors never require process termination
    pub fn is_fatal(&self) -> bool {
        false
    }
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code,
            self.message
        )?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ArchiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ArchiveErrorCode::UvArchiveSourceMissing.as_str(),
            "UV_ARCHIVE_SOURCE_MISSING"
        );
        assert_eq!(ArchiveErrorCode::UvArchiveWrite.as_str(), "UV_ARCHIVE_WRITE");
        assert_eq!(
            ArchiveErrorCode::UvArchiveNotFound.as_str(),
            "UV_ARCHIVE_NOT_FOUND"
        );
        assert_eq!(ArchiveErrorCode::UvArchiveRemote.as_str(), "UV_ARCHIVE_REMOTE");
        assert_eq!(
            ArchiveErrorCode::UvArchiveChecksum.as_str(),
            "UV_ARCHIVE_CHECKSUM"
        );
    }

    #[test]
    fn test_archive_errors_not_fatal() {
        let err = ArchiveError::not_found("a1");
        assert!(!err.is_fatal());
        assert_eq!(err.severity(), Severity::Error);
    }

    #[test]
    fn test_display_contains_code_and_message() {
        let err = ArchiveError::write_failed("disk gone");
        let display = format!("{}", err);

        assert!(display.contains("ERROR"));
        assert!(display.contains("UV_ARCHIVE_WRITE"));
        assert!(display.contains("disk gone"));
    }

    #[test]
    fn test_error_with_source() {
        let io_err = io::Error::new(io::ErrorKind::Other, "disk full");
        let err = ArchiveError::write_failed_with_source("archive failed", io_err);

        let display = format!("{}", err);
        assert!(display.contains("caused by"));
        assert!(display.contains("disk full"));
    }
}
