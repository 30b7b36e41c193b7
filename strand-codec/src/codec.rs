//! The codec contract.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use strand_core::Record;

use crate::error::CodecResult;
use crate::record::RecordCodec;

/// Shared handle to a codec.
pub type CodecRef<M> = Arc<dyn Codec<M>>;

/// Converts messages of type `M` to bytes and back.
///
/// Implementations must be total over well-formed input and satisfy the
/// round-trip law: `decode(encode(m)) == m`.
pub trait Codec<M>: Send + Sync + fmt::Debug {
    /// Implementation identity.
    ///
    /// Names the implementation, not its options: two `message` codecs with
    /// different schemas share an identity yet reject each other's frames.
    /// Logs compare identities to reject appenders and tailers that disagree.
    fn identity(&self) -> &'static str;

    /// Encodes a message.
    ///
    /// # Errors
    /// Returns `Encode` if the message cannot be represented.
    fn encode(&self, message: &M) -> CodecResult<Vec<u8>>;

    /// Decodes a message.
    ///
    /// # Errors
    /// Returns `Decode` if the bytes are malformed.
    fn decode(&self, data: &[u8]) -> CodecResult<M>;
}

/// A message type that can be carried by a log.
pub trait Message: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name used to fingerprint the schema in framed encodings.
    #[must_use]
    fn schema_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the fixed-layout codec, for types that have one.
    #[must_use]
    fn record_codec() -> Option<CodecRef<Self>> {
        None
    }

    /// Returns true if tailers should stop the partition after this message.
    fn is_poison_pill(&self) -> bool {
        false
    }
}

impl Message for Record {
    fn schema_name() -> &'static str {
        "strand.Record"
    }

    fn record_codec() -> Option<CodecRef<Self>> {
        Some(Arc::new(RecordCodec))
    }

    fn is_poison_pill(&self) -> bool {
        Self::is_poison_pill(self)
    }
}

impl Message for String {
    fn schema_name() -> &'static str {
        "string"
    }
}

/// Returns true if both codecs are absent or share an identity.
#[must_use]
pub fn same_identity<M>(a: Option<&dyn Codec<M>>, b: Option<&dyn Codec<M>>) -> bool {
    a.map(|codec| codec.identity()) == b.map(|codec| codec.identity())
}
