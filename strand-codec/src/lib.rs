//! Strand Codec - record codecs and the named codec registry.
//!
//! A [`Codec`] turns a typed message into bytes and back. Several
//! implementations can serve the same message type; they are told apart by
//! their implementation identity, and registered under names in the
//! [`CodecService`].
//!
//! # Implementations
//!
//! - `binary`: native serde binary encoding (bincode), the default codec
//! - `message`: binary framed with a schema fingerprint and a checksum
//! - `json`: schema-based text encoding (`serde_json`)
//! - `record`: fixed little-endian layout, only for [`strand_core::Record`]
//!
//! # Laws
//!
//! For every message `m` a codec supports, `decode(encode(m)) == m`, and
//! re-encoding a decoded message yields an encoding of the same length.
//!
//! # Example
//!
//! ```ignore
//! use strand_codec::{CodecConfig, CodecService};
//! use strand_core::Record;
//!
//! let service = CodecService::from_config(&CodecConfig::default())?;
//! let codec = service.get_codec::<Record>("json").expect("registered");
//! let bytes = codec.encode(&Record::new("key", "value"))?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod binary;
mod codec;
mod config;
mod error;
mod json;
mod kind;
mod message;
mod record;
mod service;

pub use binary::BinaryCodec;
pub use codec::{same_identity, Codec, CodecRef, Message};
pub use config::{CodecConfig, CodecDescriptor};
pub use error::{CodecError, CodecResult};
pub use json::JsonCodec;
pub use kind::{CodecFactory, CodecKind};
pub use message::MessageCodec;
pub use record::RecordCodec;
pub use service::CodecService;
