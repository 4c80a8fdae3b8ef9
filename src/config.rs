//! Configuration via `valuta.toml`
//!
//! Model-wide declaration defaults live in a small TOML file: the strategy
//! and cache flag used when an attribute names none, the default request
//! key and the set of available keys.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use valuta_backends::{DeclarationDefaults, Strategy};
use valuta_core::{Error, KeySet, Result, DEFAULT_AVAILABLE_KEYS};

use crate::context::PriceContext;

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "valuta.toml";

/// Configuration loaded from `valuta.toml`
///
/// # Example
///
/// ```toml
/// default_strategy = "key_value"
/// default_key = "usd"
/// available_keys = ["usd", "eur", "jpy"]
/// cache = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Strategy for attributes that name none
    #[serde(default = "default_strategy")]
    pub default_strategy: Strategy,
    /// Key used when the request context names none
    #[serde(default = "default_key")]
    pub default_key: String,
    /// Allowed keys; the built-in currency list when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_keys: Option<Vec<String>>,
    /// Wrap backends in the cache layer unless an attribute says otherwise
    #[serde(default = "default_cache")]
    pub cache: bool,
}

fn default_strategy() -> Strategy {
    Strategy::KeyValue
}

fn default_key() -> String {
    "usd".to_string()
}

fn default_cache() -> bool {
    true
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            default_strategy: default_strategy(),
            default_key: default_key(),
            available_keys: None,
            cache: default_cache(),
        }
    }
}

impl Configuration {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Valuta configuration
#
# Storage strategy for attributes that do not name one:
#   "column", "json", "hstore", "key_value" (default) or "table"
default_strategy = "key_value"

# Key used when a request does not select one
default_key = "usd"

# Keys that may be read or written (default: common ISO-4217 codes)
# available_keys = ["usd", "eur", "gbp", "jpy"]

# Cache reads per owner (required for key_value and table)
cache = true
"#
    }

    /// Parse and validate config text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Configuration = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{} ({})", msg, path.display())),
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize configuration: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Check that the key list parses and contains the default key
    pub fn validate(&self) -> Result<()> {
        let keys = self.key_set()?;
        if keys.is_empty() {
            return Err(Error::Config("available_keys is empty".to_string()));
        }
        keys.resolve(&self.default_key).map_err(|e| {
            Error::Config(format!("default_key '{}' is not usable: {}", self.default_key, e))
        })?;
        Ok(())
    }

    /// The available keys
    pub fn key_set(&self) -> Result<KeySet> {
        match &self.available_keys {
            Some(raw) => KeySet::new(raw)
                .map_err(|e| Error::Config(format!("invalid available_keys: {}", e))),
            None => KeySet::new(DEFAULT_AVAILABLE_KEYS),
        }
    }

    /// Declaration defaults for [`crate::ModelBuilder`]
    pub fn declaration_defaults(&self) -> Result<DeclarationDefaults> {
        Ok(DeclarationDefaults {
            strategy: self.default_strategy,
            cache: self.cache,
            keys: Arc::new(self.key_set()?),
        })
    }

    /// Request context at the default key
    pub fn context(&self) -> Result<PriceContext> {
        PriceContext::resolve(&self.key_set()?, &self.default_key)
    }
}
