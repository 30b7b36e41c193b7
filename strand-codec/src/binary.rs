//! Native serde binary codec.
//!
//! Encodes any serde type with bincode's standard configuration. This is
//! the codec backing stores fall back to when an appender or tailer is
//! created without one.

use std::fmt;
use std::marker::PhantomData;

use crate::codec::{Codec, Message};
use crate::error::{CodecError, CodecResult};

const IDENTITY: &str = "binary";

/// Serde binary codec backed by bincode.
pub struct BinaryCodec<M> {
    _message: PhantomData<fn() -> M>,
}

impl<M> BinaryCodec<M> {
    /// Creates a binary codec.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _message: PhantomData,
        }
    }
}

impl<M> Default for BinaryCodec<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for BinaryCodec<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryCodec").finish()
    }
}

impl<M: Message> Codec<M> for BinaryCodec<M> {
    fn identity(&self) -> &'static str {
        IDENTITY
    }

    fn encode(&self, message: &M) -> CodecResult<Vec<u8>> {
        bincode::serde::encode_to_vec(message, bincode::config::standard())
            .map_err(|e| CodecError::encode(IDENTITY, e.to_string()))
    }

    fn decode(&self, data: &[u8]) -> CodecResult<M> {
        let (message, read) =
            bincode::serde::decode_from_slice::<M, _>(data, bincode::config::standard())
                .map_err(|e| CodecError::decode(IDENTITY, e.to_string()))?;
        if read != data.len() {
            return Err(CodecError::decode(
                IDENTITY,
                format!("{} trailing bytes", data.len() - read),
            ));
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::{Flag, Flags, Record};

    fn record() -> Record {
        Record::new("key", "value")
            .with_watermark(1_700_000_000_000)
            .with_flags(Flags::from_iter([Flag::Commit, Flag::Trace]))
    }

    #[test]
    fn test_roundtrip_and_stable_size() {
        let codec = BinaryCodec::<Record>::new();
        let src = record();

        let data = codec.encode(&src).unwrap();
        let dest = codec.decode(&data).unwrap();
        assert_eq!(dest, src);

        let data2 = codec.encode(&dest).unwrap();
        assert_eq!(data.len(), data2.len());
        assert_eq!(codec.decode(&data2).unwrap(), src);
    }

    #[test]
    fn test_string_messages() {
        let codec = BinaryCodec::<String>::new();
        let data = codec.encode(&"hello".to_string()).unwrap();
        assert_eq!(codec.decode(&data).unwrap(), "hello");
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let codec = BinaryCodec::<Record>::new();
        let mut data = codec.encode(&record()).unwrap();
        data.push(0);
        assert!(matches!(
            codec.decode(&data),
            Err(CodecError::Decode { codec: "binary", .. })
        ));
    }

    #[test]
    fn test_truncated_input_rejected() {
        let codec = BinaryCodec::<Record>::new();
        let data = codec.encode(&record()).unwrap();
        assert!(codec.decode(&data[..data.len() / 2]).is_err());
    }
}
