//! Schema-based text codec using JSON.

use std::fmt;
use std::marker::PhantomData;

use crate::codec::{Codec, Message};
use crate::error::{CodecError, CodecResult};

const IDENTITY: &str = "json";

/// JSON text codec backed by `serde_json`.
pub struct JsonCodec<M> {
    pretty: bool,
    _message: PhantomData<fn() -> M>,
}

impl<M> JsonCodec<M> {
    /// Creates a compact JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pretty: false,
            _message: PhantomData,
        }
    }

    /// Creates a JSON codec that indents its output.
    #[must_use]
    pub const fn pretty() -> Self {
        Self {
            pretty: true,
            _message: PhantomData,
        }
    }

    /// Returns true if output is indented.
    #[must_use]
    pub const fn is_pretty(&self) -> bool {
        self.pretty
    }
}

impl<M> Default for JsonCodec<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for JsonCodec<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonCodec")
            .field("pretty", &self.pretty)
            .finish()
    }
}

impl<M: Message> Codec<M> for JsonCodec<M> {
    fn identity(&self) -> &'static str {
        IDENTITY
    }

    fn encode(&self, message: &M) -> CodecResult<Vec<u8>> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(message)
        } else {
            serde_json::to_vec(message)
        };
        encoded.map_err(|e| CodecError::encode(IDENTITY, e.to_string()))
    }

    fn decode(&self, data: &[u8]) -> CodecResult<M> {
        serde_json::from_slice(data).map_err(|e| CodecError::decode(IDENTITY, e.to_string()))
    }
}
