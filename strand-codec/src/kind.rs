//! Codec implementations known to the registry.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::binary::BinaryCodec;
use crate::codec::{CodecRef, Message};
use crate::error::{CodecError, CodecResult};
use crate::json::JsonCodec;
use crate::message::MessageCodec;

/// Supported codec implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecKind {
    /// Serde binary encoding.
    Binary,
    /// Schema-fingerprinted binary frames.
    Message,
    /// JSON text.
    Json,
    /// Fixed record layout.
    Record,
}

impl CodecKind {
    /// Returns the implementation name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Message => "message",
            Self::Json => "json",
            Self::Record => "record",
        }
    }

    /// Parses an implementation name.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the implementation is not recognized.
    pub fn parse(s: &str) -> CodecResult<Self> {
        s.parse()
    }
}

impl FromStr for CodecKind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "binary" | "bincode" | "native" => Ok(Self::Binary),
            "message" | "framed" => Ok(Self::Message),
            "json" | "text" => Ok(Self::Json),
            "record" => Ok(Self::Record),
            other => Err(CodecError::configuration(format!(
                "unknown codec implementation: {other}"
            ))),
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validated, live form of a codec descriptor.
///
/// A factory builds codec instances for any message type it can honor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecFactory {
    kind: CodecKind,
    pretty: bool,
    schema: Option<String>,
}

impl CodecFactory {
    /// Builds a factory from an implementation and its options.
    ///
    /// Recognized options: `pretty` (`json`, boolean) and `schema`
    /// (`message`, non-empty schema name). Other options are kept on the
    /// descriptor but ignored here.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if an option has an invalid value.
    pub fn new(kind: CodecKind, options: &HashMap<String, String>) -> CodecResult<Self> {
        let pretty = match options.get("pretty") {
            None => false,
            Some(value) if kind == CodecKind::Json => value.parse::<bool>().map_err(|_| {
                CodecError::configuration(format!("option pretty must be a boolean, got {value:?}"))
            })?,
            Some(_) => {
                return Err(CodecError::configuration(format!(
                    "option pretty is not supported by the {kind} codec"
                )))
            }
        };

        let schema = match options.get("schema") {
            None => None,
            Some(value) if value.is_empty() => {
                return Err(CodecError::configuration("option schema must not be empty"))
            }
            Some(value) if kind == CodecKind::Message => Some(value.clone()),
            Some(_) => {
                return Err(CodecError::configuration(format!(
                    "option schema is not supported by the {kind} codec"
                )))
            }
        };

        Ok(Self {
            kind,
            pretty,
            schema,
        })
    }

    /// Returns the implementation.
    #[must_use]
    pub const fn kind(&self) -> CodecKind {
        self.kind
    }

    /// Builds a codec for `M`, or `None` if this implementation cannot
    /// honor that message type.
    #[must_use]
    pub fn codec<M: Message>(&self) -> Option<CodecRef<M>> {
        match self.kind {
            CodecKind::Binary => Some(Arc::new(BinaryCodec::<M>::new())),
            CodecKind::Message => Some(Arc::new(match &self.schema {
                Some(schema) => MessageCodec::<M>::with_schema(schema.as_str()),
                None => MessageCodec::<M>::new(),
            })),
            CodecKind::Json if self.pretty => Some(Arc::new(JsonCodec::<M>::pretty())),
            CodecKind::Json => Some(Arc::new(JsonCodec::<M>::new())),
            CodecKind::Record => M::record_codec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Codec;
    use strand_core::Record;

    fn options(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!(CodecKind::parse("binary").unwrap(), CodecKind::Binary);
        assert_eq!(CodecKind::parse("native").unwrap(), CodecKind::Binary);
        assert_eq!(CodecKind::parse("MESSAGE").unwrap(), CodecKind::Message);
        assert_eq!(CodecKind::parse("framed").unwrap(), CodecKind::Message);
        assert_eq!(CodecKind::parse("json").unwrap(), CodecKind::Json);
        assert_eq!(CodecKind::parse("record").unwrap(), CodecKind::Record);
        assert!(matches!(
            CodecKind::parse("avro"),
            Err(CodecError::Configuration { .. })
        ));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(CodecKind::Binary.to_string(), "binary");
        assert_eq!(CodecKind::Message.to_string(), "message");
        assert_eq!(CodecKind::Json.to_string(), "json");
        assert_eq!(CodecKind::Record.to_string(), "record");
    }

    #[test]
    fn test_factory_identity_matches_kind() {
        for kind in [
            CodecKind::Binary,
            CodecKind::Message,
            CodecKind::Json,
            CodecKind::Record,
        ] {
            let factory = CodecFactory::new(kind, &HashMap::new()).unwrap();
            let codec = factory.codec::<Record>().unwrap();
            assert_eq!(codec.identity(), kind.as_str());
        }
    }

    #[test]
    fn test_record_kind_only_honors_records() {
        let factory = CodecFactory::new(CodecKind::Record, &HashMap::new()).unwrap();
        assert!(factory.codec::<Record>().is_some());
        assert!(factory.codec::<String>().is_none());
    }

    #[test]
    fn test_options_validated() {
        assert!(CodecFactory::new(CodecKind::Json, &options(&[("pretty", "true")])).is_ok());
        assert!(CodecFactory::new(CodecKind::Json, &options(&[("pretty", "yes")])).is_err());
        assert!(CodecFactory::new(CodecKind::Binary, &options(&[("pretty", "true")])).is_err());
        assert!(CodecFactory::new(CodecKind::Message, &options(&[("schema", "")])).is_err());
        assert!(CodecFactory::new(CodecKind::Json, &options(&[("schema", "x")])).is_err());
        assert!(CodecFactory::new(CodecKind::Binary, &options(&[("comment", "x")])).is_ok());
    }

    #[test]
    fn test_schema_option_applied() {
        let factory =
            CodecFactory::new(CodecKind::Message, &options(&[("schema", "events.v2")])).unwrap();
        let custom = factory.codec::<Record>().unwrap();
        let default = MessageCodec::<Record>::new();

        // Same identity, yet the schemas keep the frames apart.
        assert_eq!(custom.identity(), default.identity());
        let data = custom.encode(&Record::new("k", "v")).unwrap();
        assert!(default.decode(&data).is_err());
        assert_eq!(custom.decode(&data).unwrap(), Record::new("k", "v"));
    }
}
