//! Codec settings, loadable from TOML.
//!
//! ```toml
//! trusted_source = true
//! pretty = false
//! console_shim = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid codec config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render codec config: {0}")]
    Render(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Decode `function` nodes by parsing their source text. Off by default: evaluating
    /// source from a peer runs its code in this process.
    pub trusted_source: bool,
    /// Indent the encoded JSON.
    pub pretty: bool,
    /// Re-resolve `console.*` names against the active console instance.
    pub console_shim: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig {
            trusted_source: false,
            pretty: false,
            console_shim: true,
        }
    }
}

impl CodecConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn with_trusted_source(mut self, trusted: bool) -> Self {
        self.trusted_source = trusted;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}
