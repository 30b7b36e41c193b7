//! Fixed-layout binary codec for [`Record`].
//!
//! # Layout
//!
//! ```text
//! flags: u8 | watermark: u64 LE | key len: u32 LE | key | data len: u32 LE | data
//! ```
//!
//! The layout has no varints, so the encoded size depends only on the key
//! and payload lengths.

use bytes::{Buf, BufMut, Bytes};
use strand_core::{Flags, Record};

use crate::codec::Codec;
use crate::error::{CodecError, CodecResult};

const IDENTITY: &str = "record";

const FIXED_SIZE: usize = 1 + 8 + 4 + 4;

/// Fixed-layout codec, honoring only [`Record`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordCodec;

impl Codec<Record> for RecordCodec {
    fn identity(&self) -> &'static str {
        IDENTITY
    }

    #[allow(clippy::cast_possible_truncation)] // Lengths checked against u32::MAX.
    fn encode(&self, record: &Record) -> CodecResult<Vec<u8>> {
        if record.key.len() > u32::MAX as usize || record.data.len() > u32::MAX as usize {
            return Err(CodecError::encode(IDENTITY, "key or data exceeds u32 length"));
        }
        let mut buf = Vec::with_capacity(FIXED_SIZE + record.key.len() + record.data.len());
        buf.put_u8(record.flags.bits());
        buf.put_u64_le(record.watermark);
        buf.put_u32_le(record.key.len() as u32);
        buf.put_slice(record.key.as_bytes());
        buf.put_u32_le(record.data.len() as u32);
        buf.put_slice(&record.data);
        Ok(buf)
    }

    fn decode(&self, data: &[u8]) -> CodecResult<Record> {
        let mut buf = data;
        if buf.remaining() < FIXED_SIZE {
            return Err(CodecError::decode(IDENTITY, "buffer shorter than fixed header"));
        }

        let flags = Flags::from_bits(buf.get_u8())
            .map_err(|e| CodecError::decode(IDENTITY, e.to_string()))?;
        let watermark = buf.get_u64_le();

        let key_len = buf.get_u32_le() as usize;
        if buf.remaining() < key_len + 4 {
            return Err(CodecError::decode(IDENTITY, "truncated key"));
        }
        let key = std::str::from_utf8(&buf[..key_len])
            .map_err(|e| CodecError::decode(IDENTITY, format!("key is not UTF-8: {e}")))?
            .to_owned();
        buf.advance(key_len);

        let data_len = buf.get_u32_le() as usize;
        if buf.remaining() != data_len {
            return Err(CodecError::decode(
                IDENTITY,
                format!("expected {data_len} data bytes, found {}", buf.remaining()),
            ));
        }
        let payload = Bytes::copy_from_slice(buf);

        Ok(Record {
            key,
            data: payload,
            watermark,
            flags,
        })
    }
}
