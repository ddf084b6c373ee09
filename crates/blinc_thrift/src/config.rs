//! Codec configuration
//!
//! Settings are plain data so they can live in a `thrift.toml` next to the
//! IDL sources:
//!
//! ```toml
//! annotation_key = "rs.type"
//! max_depth = 64
//! ```

use serde::{Deserialize, Serialize};

use crate::protocol::DEFAULT_MAX_DEPTH;

/// Annotation key selecting in-memory representations
pub const DEFAULT_ANNOTATION_KEY: &str = "rs.type";

/// Configuration shared by the registry builder and the compiler
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ThriftConfig {
    /// Annotation read for i64 and map representations,
    /// e.g. `map<string, i16> (rs.type = "entries")`
    #[serde(default = "default_annotation_key")]
    pub annotation_key: String,
    /// Deepest struct/collection nesting a decode will follow
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_annotation_key() -> String {
    DEFAULT_ANNOTATION_KEY.to_string()
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for ThriftConfig {
    fn default() -> Self {
        Self {
            annotation_key: default_annotation_key(),
            max_depth: default_max_depth(),
        }
    }
}

impl ThriftConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Use a different representation annotation key
    pub fn with_annotation_key(mut self, key: impl Into<String>) -> Self {
        self.annotation_key = key.into();
        self
    }

    /// Limit decode nesting depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
