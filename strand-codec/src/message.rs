//! Schema-framed binary codec.
//!
//! Each message is written as a self-describing frame:
//!
//! ```text
//! +-------+-------+-------------+-------------+---------+-----------+
//! | 0xC3  | 0x01  | fingerprint | payload len | payload | crc32     |
//! | 1 B   | 1 B   | u32 LE      | u32 LE      | N bytes | u32 LE    |
//! +-------+-------+-------------+-------------+---------+-----------+
//! ```
//!
//! The fingerprint is the CRC32 of the schema name, so a reader rejects
//! frames written for another message type before touching the payload.
//! The payload uses the serde binary encoding.

use std::fmt;
use std::marker::PhantomData;

use bytes::{Buf, BufMut};

use crate::codec::{Codec, Message};
use crate::error::{CodecError, CodecResult};

const IDENTITY: &str = "message";

const MAGIC: [u8; 2] = [0xC3, 0x01];

/// Magic + fingerprint + payload length.
const HEADER_SIZE: usize = 2 + 4 + 4;

const TRAILER_SIZE: usize = 4;

/// Binary codec framing each message with a schema fingerprint.
pub struct MessageCodec<M> {
    schema: String,
    fingerprint: u32,
    _message: PhantomData<fn() -> M>,
}

impl<M: Message> MessageCodec<M> {
    /// Creates a codec fingerprinted with the message's schema name.
    #[must_use]
    pub fn new() -> Self {
        Self::with_schema(M::schema_name())
    }
}

impl<M> MessageCodec<M> {
    /// Creates a codec fingerprinted with an explicit schema name.
    #[must_use]
    pub fn with_schema(schema: impl Into<String>) -> Self {
        let schema = schema.into();
        let fingerprint = crc32fast::hash(schema.as_bytes());
        Self {
            schema,
            fingerprint,
            _message: PhantomData,
        }
    }

    /// Returns the schema name.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Returns the schema fingerprint written in every frame.
    #[must_use]
    pub const fn fingerprint(&self) -> u32 {
        self.fingerprint
    }
}

impl<M: Message> Default for MessageCodec<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for MessageCodec<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageCodec")
            .field("schema", &self.schema)
            .field("fingerprint", &format_args!("{:#010x}", self.fingerprint))
            .finish()
    }
}

impl<M: Message> Codec<M> for MessageCodec<M> {
    fn identity(&self) -> &'static str {
        IDENTITY
    }

    #[allow(clippy::cast_possible_truncation)] // Payload length checked against u32::MAX.
    fn encode(&self, message: &M) -> CodecResult<Vec<u8>> {
        let payload = bincode::serde::encode_to_vec(message, bincode::config::standard())
            .map_err(|e| CodecError::encode(IDENTITY, e.to_string()))?;
        if payload.len() > u32::MAX as usize {
            return Err(CodecError::encode(
                IDENTITY,
                format!("payload of {} bytes does not fit a frame", payload.len()),
            ));
        }

        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len() + TRAILER_SIZE);
        buf.put_slice(&MAGIC);
        buf.put_u32_le(self.fingerprint);
        buf.put_u32_le(payload.len() as u32);
        buf.put_slice(&payload);
        buf.put_u32_le(crc32fast::hash(&payload));
        Ok(buf)
    }

    fn decode(&self, data: &[u8]) -> CodecResult<M> {
        if data.len() < HEADER_SIZE + TRAILER_SIZE {
            return Err(CodecError::decode(
                IDENTITY,
                format!("frame of {} bytes is shorter than its header", data.len()),
            ));
        }
        if data[..2] != MAGIC {
            return Err(CodecError::decode(IDENTITY, "bad magic bytes"));
        }

        let mut buf = &data[2..];
        let fingerprint = buf.get_u32_le();
        if fingerprint != self.fingerprint {
            return Err(CodecError::SchemaMismatch {
                expected: self.fingerprint,
                actual: fingerprint,
            });
        }

        let payload_len = buf.get_u32_le() as usize;
        if buf.remaining() != payload_len + TRAILER_SIZE {
            return Err(CodecError::decode(
                IDENTITY,
                format!(
                    "payload length {payload_len} does not match frame of {} bytes",
                    data.len()
                ),
            ));
        }
        let payload = &data[HEADER_SIZE..HEADER_SIZE + payload_len];
        buf.advance(payload_len);
        let expected_crc = buf.get_u32_le();
        let actual_crc = crc32fast::hash(payload);
        if expected_crc != actual_crc {
            return Err(CodecError::decode(
                IDENTITY,
                format!("checksum mismatch: {expected_crc:#010x} != {actual_crc:#010x}"),
            ));
        }

        let (message, read) =
            bincode::serde::decode_from_slice::<M, _>(payload, bincode::config::standard())
                .map_err(|e| CodecError::decode(IDENTITY, e.to_string()))?;
        if read != payload_len {
            return Err(CodecError::decode(IDENTITY, "payload has trailing bytes"));
        }
        Ok(message)
    }
}
