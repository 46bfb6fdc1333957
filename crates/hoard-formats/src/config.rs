//! Build configuration
//!
//! A build config is a `key = value value ...` text file naming the system
//! files of one game build. The CASC source reads the root and encoding keys
//! from it, plus the build name for display.

use std::collections::HashMap;

use hoard_crypto::{ContentKey, EncodingKey};
use thiserror::Error;

/// Build config errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required key is absent
    #[error("missing {0} field")]
    MissingField(&'static str),

    /// A key value is not 32 hex characters
    #[error("invalid hash in {field}: {value}")]
    InvalidHash {
        /// Config key
        field: &'static str,
        /// Offending value
        value: String,
    },
}

/// Build configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildConfig {
    entries: HashMap<String, Vec<String>>,
}

/// Content and encoding key of the encoding table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingRef {
    /// Content key of the decoded table
    pub content_key: ContentKey,
    /// Encoding key of the stored BLTE frame
    pub encoding_key: EncodingKey,
}

impl BuildConfig {
    /// Parse config text; blank lines and `#` comments are skipped
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| {
                (
                    key.trim().to_string(),
                    value.split_whitespace().map(String::from).collect(),
                )
            })
            .collect();
        Self { entries }
    }

    /// Raw values of a key
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    /// Content key of the root table
    pub fn root(&self) -> Result<ContentKey, ConfigError> {
        let value = self.first("root").ok_or(ConfigError::MissingField("root"))?;
        ContentKey::from_hex(value).map_err(|_| ConfigError::InvalidHash {
            field: "root",
            value: value.to_string(),
        })
    }

    /// Content and encoding key of the encoding table
    pub fn encoding(&self) -> Result<EncodingRef, ConfigError> {
        let values = self
            .get("encoding")
            .ok_or(ConfigError::MissingField("encoding"))?;
        let invalid = |value: &str| ConfigError::InvalidHash {
            field: "encoding",
            value: value.to_string(),
        };

        let [ckey, ekey, ..] = values else {
            return Err(invalid(&values.join(" ")));
        };
        Ok(EncodingRef {
            content_key: ContentKey::from_hex(ckey).map_err(|_| invalid(ckey))?,
            encoding_key: EncodingKey::from_hex(ekey).map_err(|_| invalid(ekey))?,
        })
    }

    /// Human-readable build name, e.g. `WOW-54601patch11.0.7_Retail`
    pub fn build_name(&self) -> Option<&str> {
        self.first("build-name")
    }

    /// Product code of the build
    pub fn build_uid(&self) -> Option<&str> {
        self.first("build-uid")
    }
}
