//! Log management error types.

use strand_codec::CodecError;
use strand_core::{CoreError, LogPartition};
use thiserror::Error;

/// Result type for log operations.
pub type LogResult<T> = Result<T, LogError>;

/// Errors that can occur while managing logs, appenders and tailers.
///
/// Everything except `Backend` reports a programming or configuration
/// error: none of them is retried by this crate.
#[derive(Debug, Error)]
pub enum LogError {
    /// The log does not exist.
    #[error("unknown log: {name}")]
    UnknownLog {
        /// Log name.
        name: String,
    },

    /// The partition is already owned by a live tailer of the group.
    #[error("tailer for partition {partition} already created in group {group}")]
    AlreadyAssigned {
        /// Consumer group.
        group: String,
        /// Partition already owned.
        partition: LogPartition,
    },

    /// The requested codec conflicts with the codec the log was opened with.
    #[error("log {name} uses the {existing} codec, cannot use {requested}")]
    CodecMismatch {
        /// Log name.
        name: String,
        /// Codec of the existing appender (`default` when none).
        existing: String,
        /// Requested codec (`default` when none).
        requested: String,
    },

    /// The appender of a log was opened for another message type.
    #[error("log {name} carries {existing} messages, not {requested}")]
    MessageTypeMismatch {
        /// Log name.
        name: String,
        /// Message type of the existing appender.
        existing: &'static str,
        /// Requested message type.
        requested: &'static str,
    },

    /// The backing store does not support the operation.
    #[error("operation not supported by the backing store: {operation}")]
    Unsupported {
        /// The unsupported operation.
        operation: &'static str,
    },

    /// The partition index is outside the log.
    #[error("partition {partition} out of range for log {name} of size {size}")]
    PartitionOutOfRange {
        /// Log name.
        name: String,
        /// Requested partition index.
        partition: u32,
        /// Partition count of the log.
        size: u32,
    },

    /// The tailer is not assigned the partition.
    #[error("partition {partition} is not assigned to this tailer")]
    NotAssigned {
        /// The partition.
        partition: LogPartition,
    },

    /// The resource has been closed.
    #[error("{resource} is closed")]
    Closed {
        /// What was closed.
        resource: &'static str,
    },

    /// Closing some resources failed; every resource was still attempted.
    #[error("{} resource(s) failed to close, first: {}", failures.len(), failures.first().map_or("", String::as_str))]
    CloseFailed {
        /// One message per failure.
        failures: Vec<String>,
    },

    /// An argument failed validation.
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// Encoding or decoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The backing store failed.
    #[error("backing store error during {operation}: {message}")]
    Backend {
        /// The operation that failed.
        operation: &'static str,
        /// Error description.
        message: String,
    },
}

impl LogError {
    pub(crate) fn unknown_log(name: impl Into<String>) -> Self {
        Self::UnknownLog { name: name.into() }
    }

    pub(crate) fn codec_mismatch(
        name: &str,
        existing: Option<&str>,
        requested: Option<&str>,
    ) -> Self {
        Self::CodecMismatch {
            name: name.to_string(),
            existing: existing.unwrap_or("default").to_string(),
            requested: requested.unwrap_or("default").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LogError::AlreadyAssigned {
            group: "g1".into(),
            partition: LogPartition::new("events", 0),
        };
        assert_eq!(
            err.to_string(),
            "tailer for partition events-00 already created in group g1"
        );

        let err = LogError::codec_mismatch("events", Some("binary"), None);
        assert_eq!(
            err.to_string(),
            "log events uses the binary codec, cannot use default"
        );
    }

    #[test]
    fn test_close_failed_display() {
        let err = LogError::CloseFailed {
            failures: vec!["appender events: boom".into(), "tailer-3: boom".into()],
        };
        assert_eq!(
            err.to_string(),
            "2 resource(s) failed to close, first: appender events: boom"
        );
    }

    #[test]
    fn test_from_core_error() {
        let err: LogError = CoreError::InvalidArgument {
            name: "partitions",
            reason: "must be positive".into(),
        }
        .into();
        assert!(matches!(err, LogError::Invalid(_)));
        assert!(err.to_string().contains("partitions"));
    }
}
