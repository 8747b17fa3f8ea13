//! Error types for calsync.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur in calsync operations.
#[derive(Error, Debug)]
pub enum CalSyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Calendar store error: {0}")]
    Store(String),

    #[error("Mail transport error: {0}")]
    Transport(String),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    /// Attempted to delete an occurrence that this system does not own.
    #[error("Refusing to delete untagged occurrence {start} - {end}")]
    UntaggedDeletion {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse classification used when reporting a failed run to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Configuration,
    Transport,
    Parse,
    InvariantViolation,
}

impl CalSyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CalSyncError::Config(_) => ErrorKind::Configuration,
            CalSyncError::IcsParse(_) => ErrorKind::Parse,
            CalSyncError::UntaggedDeletion { .. } => ErrorKind::InvariantViolation,
            CalSyncError::Store(_)
            | CalSyncError::Transport(_)
            | CalSyncError::Io(_)
            | CalSyncError::Serialization(_) => ErrorKind::Transport,
        }
    }
}

/// Result type alias for calsync operations.
pub type CalSyncResult<T> = Result<T, CalSyncError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn untagged_deletion_is_an_invariant_violation() {
        let err = CalSyncError::UntaggedDeletion {
            start: Utc.with_ymd_and_hms(2025, 3, 20, 9, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 3, 20, 10, 0, 0).unwrap(),
        };
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
        assert!(err.to_string().contains("untagged"));
    }

    #[test]
    fn io_errors_count_as_transport() {
        let err: CalSyncError = std::io::Error::other("disk gone").into();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn codec_failures_are_parse_errors() {
        let err = CalSyncError::IcsParse("No VCALENDAR in calendar data".into());
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(
            CalSyncError::Config("missing folder".into()).kind(),
            ErrorKind::Configuration
        );
    }
}
