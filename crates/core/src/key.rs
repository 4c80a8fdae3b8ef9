//! Key normalization for Valuta
//!
//! A key selects which keyed value of an attribute is read or written. In
//! practice keys are ISO-4217 currency codes, but nothing below depends on
//! that beyond the default [`KeySet`].
//!
//! ## Contract
//!
//! Two raw keys that normalize to the same [`Key`] address the same stored
//! value. Normalization rules:
//! - Surrounding whitespace is trimmed
//! - ASCII letters are lowercased
//! - `-` is mapped to `_` (so `pt-BR` and `pt_br` are one key)
//! - The result must be 1..=16 bytes of `[a-z0-9_]` starting with a letter
//!
//! The last rule guarantees every key can be used as a column-name suffix.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Error, Result};

/// Maximum length of a normalized key in bytes
pub const MAX_KEY_BYTES: usize = 16;

/// A normalized key (currency code)
///
/// Construct with [`Key::new`]; the inner string is always canonical.
///
/// # Examples
///
/// ```
/// use valuta_core::Key;
///
/// let usd = Key::new(" USD ").unwrap();
/// assert_eq!(usd.as_str(), "usd");
/// assert_eq!(Key::new("pt-BR").unwrap(), Key::new("pt_br").unwrap());
/// assert!(Key::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key(String);

impl Key {
    /// Normalize and validate a raw key
    pub fn new(raw: &str) -> std::result::Result<Self, KeyError> {
        let normalized: String = raw
            .trim()
            .chars()
            .map(|c| if c == '-' { '_' } else { c.to_ascii_lowercase() })
            .collect();

        if normalized.is_empty() {
            return Err(KeyError::Empty);
        }
        if normalized.len() > MAX_KEY_BYTES {
            return Err(KeyError::TooLong {
                actual: normalized.len(),
                max: MAX_KEY_BYTES,
            });
        }
        if let Some(c) = normalized
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_'))
        {
            return Err(KeyError::InvalidCharacter(c));
        }
        if !normalized.starts_with(|c: char| c.is_ascii_lowercase()) {
            return Err(KeyError::MustStartWithLetter);
        }

        Ok(Key(normalized))
    }

    /// The canonical string form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Key {
    type Err = KeyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Key::new(s)
    }
}

impl TryFrom<String> for Key {
    type Error = KeyError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Key::new(&value)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Key normalization errors
///
/// These surface to callers as [`Error::InvalidKey`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Key is empty after trimming
    #[error("key cannot be empty")]
    Empty,

    /// Key contains a character outside `[a-z0-9_]` after normalization
    #[error("key contains invalid character {0:?}")]
    InvalidCharacter(char),

    /// Key starts with a digit or underscore
    #[error("key must start with a letter")]
    MustStartWithLetter,

    /// Key exceeds [`MAX_KEY_BYTES`]
    #[error("key too long: {actual} bytes exceeds maximum {max}")]
    TooLong {
        /// Actual normalized length in bytes
        actual: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Key is well-formed but not in the allowed set
    #[error("key is not in the set of available keys")]
    NotAvailable,
}

impl KeyError {
    /// Short machine-readable reason
    pub fn reason_code(&self) -> &'static str {
        match self {
            KeyError::Empty => "empty_key",
            KeyError::InvalidCharacter(_) => "invalid_character",
            KeyError::MustStartWithLetter => "must_start_with_letter",
            KeyError::TooLong { .. } => "key_too_long",
            KeyError::NotAvailable => "not_available",
        }
    }
}

/// Currency codes available when no explicit set is configured
pub const DEFAULT_AVAILABLE_KEYS: &[&str] = &[
    "aud", "brl", "cad", "chf", "cny", "czk", "dkk", "eur", "gbp", "hkd", "huf", "idr", "ils",
    "inr", "jpy", "krw", "mxn", "myr", "nok", "nzd", "php", "pln", "rub", "sek", "sgd", "thb",
    "try", "twd", "usd", "zar",
];

/// The set of keys that may be read or written
///
/// Setting the request key, declaring accessors and discovering Column
/// keys all go through [`KeySet::resolve`] / [`KeySet::contains`], so a
/// key outside the set is rejected instead of silently coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySet {
    keys: BTreeSet<Key>,
}

impl KeySet {
    /// Build a set from raw keys, normalizing each
    pub fn new<I, S>(raw: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keys = BTreeSet::new();
        for r in raw {
            let r = r.as_ref();
            let key = Key::new(r).map_err(|e| Error::invalid_key(r, e))?;
            keys.insert(key);
        }
        Ok(Self { keys })
    }

    /// Normalize `raw` and check membership
    pub fn resolve(&self, raw: &str) -> Result<Key> {
        let key = Key::new(raw).map_err(|e| Error::invalid_key(raw, e))?;
        if self.keys.contains(&key) {
            Ok(key)
        } else {
            Err(Error::invalid_key(raw, KeyError::NotAvailable))
        }
    }

    /// Check an already-normalized key
    pub fn ensure(&self, key: &Key) -> Result<()> {
        if self.keys.contains(key) {
            Ok(())
        } else {
            Err(Error::invalid_key(key.as_str(), KeyError::NotAvailable))
        }
    }

    /// Whether `key` is in the set
    pub fn contains(&self, key: &Key) -> bool {
        self.keys.contains(key)
    }

    /// Iterate keys in ascending order
    pub fn iter(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for KeySet {
    fn default() -> Self {
        Self {
            keys: DEFAULT_AVAILABLE_KEYS
                .iter()
                .map(|k| Key(k.to_string()))
                .collect(),
        }
    }
}
