//! Codec error types.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding, decoding or configuring codecs.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A message could not be encoded.
    #[error("{codec} codec failed to encode: {message}")]
    Encode {
        /// Codec implementation.
        codec: &'static str,
        /// Error description.
        message: String,
    },

    /// Bytes could not be decoded into a message.
    #[error("{codec} codec failed to decode: {message}")]
    Decode {
        /// Codec implementation.
        codec: &'static str,
        /// Error description.
        message: String,
    },

    /// Framed bytes were written with another schema.
    #[error("schema fingerprint mismatch: expected {expected:#010x}, found {actual:#010x}")]
    SchemaMismatch {
        /// Fingerprint of the reader schema.
        expected: u32,
        /// Fingerprint found in the frame.
        actual: u32,
    },

    /// A codec descriptor or configuration file is invalid.
    #[error("invalid codec configuration: {message}")]
    Configuration {
        /// Error description.
        message: String,
    },

    /// A configuration file could not be read.
    #[error("failed to read codec configuration from {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
}

impl CodecError {
    pub(crate) fn decode(codec: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            codec,
            message: message.into(),
        }
    }

    pub(crate) fn encode(codec: &'static str, message: impl Into<String>) -> Self {
        Self::Encode {
            codec,
            message: message.into(),
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodecError::decode("json", "expected value at line 1");
        assert_eq!(
            err.to_string(),
            "json codec failed to decode: expected value at line 1"
        );

        let err = CodecError::SchemaMismatch {
            expected: 0xdead_beef,
            actual: 1,
        };
        assert!(err.to_string().contains("0xdeadbeef"));
        assert!(err.to_string().contains("0x00000001"));
    }
}
