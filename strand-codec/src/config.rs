//! Codec configuration.
//!
//! Codecs are declared in TOML, one `[[codec]]` table per name:
//!
//! ```toml
//! [[codec]]
//! name = "avro"
//! implementation = "message"
//!
//! [[codec]]
//! name = "debug"
//! implementation = "json"
//! options = { pretty = "true" }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};
use crate::kind::{CodecFactory, CodecKind};

/// Static description of one named codec.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecDescriptor {
    /// Name the codec is registered under.
    pub name: String,
    /// Implementation name, see [`CodecKind`].
    pub implementation: String,
    /// Implementation options.
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl CodecDescriptor {
    /// Creates a descriptor without options.
    #[must_use]
    pub fn new(name: impl Into<String>, implementation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            implementation: implementation.into(),
            options: HashMap::new(),
        }
    }

    /// Adds an option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Returns an option value.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Returns an option value, or `default` when unset.
    #[must_use]
    pub fn option_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.option(key).unwrap_or(default)
    }

    /// Materializes the descriptor into a codec factory.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the name is empty, the implementation is
    /// unknown, or an option is invalid.
    pub fn factory(&self) -> CodecResult<CodecFactory> {
        if self.name.is_empty() {
            return Err(CodecError::configuration("codec name must not be empty"));
        }
        let kind = CodecKind::parse(&self.implementation).map_err(|e| {
            CodecError::configuration(format!("codec {}: {e}", self.name))
        })?;
        CodecFactory::new(kind, &self.options)
            .map_err(|e| CodecError::configuration(format!("codec {}: {e}", self.name)))
    }
}

impl fmt::Debug for CodecDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecDescriptor")
            .field("name", &self.name)
            .field("implementation", &self.implementation)
            .field("options", &self.options)
            .finish()
    }
}

/// The set of codec descriptors loaded at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Descriptors, registered in order.
    #[serde(default, rename = "codec")]
    pub codecs: Vec<CodecDescriptor>,
}

impl CodecConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub const fn empty() -> Self {
        Self { codecs: Vec::new() }
    }

    /// Adds a descriptor.
    #[must_use]
    pub fn with_codec(mut self, descriptor: CodecDescriptor) -> Self {
        self.codecs.push(descriptor);
        self
    }

    /// Loads a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> CodecResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| CodecError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML cannot be parsed.
    pub fn from_toml(toml: &str) -> CodecResult<Self> {
        toml::from_str(toml).map_err(|e| CodecError::configuration(e.to_string()))
    }

    /// Serializes the configuration to a TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

impl Default for CodecConfig {
    /// The stock codecs: `default` and `binary` (serde binary), `message`,
    /// `json` and `record`.
    fn default() -> Self {
        Self::empty()
            .with_codec(CodecDescriptor::new("default", "binary"))
            .with_codec(CodecDescriptor::new("binary", "binary"))
            .with_codec(CodecDescriptor::new("message", "message"))
            .with_codec(CodecDescriptor::new("json", "json"))
            .with_codec(CodecDescriptor::new("record", "record"))
    }
}
