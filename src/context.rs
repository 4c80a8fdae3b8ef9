//! Request-scoped key selection
//!
//! A [`PriceContext`] carries the key a request reads and writes at by
//! default. It is an ordinary value passed to `*_in` accessor methods; no
//! operation consults thread-local or global state.

use valuta_core::{Key, KeySet, Result};

/// Default key for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceContext {
    key: Key,
}

impl PriceContext {
    /// Context at an already-validated key
    pub fn new(key: Key) -> Self {
        Self { key }
    }

    /// Context at `raw`, normalized and checked against `keys`
    pub fn resolve(keys: &KeySet, raw: &str) -> Result<Self> {
        Ok(Self {
            key: keys.resolve(raw)?,
        })
    }

    /// Current key
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Switch the current key
    pub fn set_key(&mut self, keys: &KeySet, raw: &str) -> Result<()> {
        self.key = keys.resolve(raw)?;
        Ok(())
    }

    /// Run `f` with a context at `key`, leaving `self` unchanged
    pub fn with_key<R>(&self, key: Key, f: impl FnOnce(&PriceContext) -> R) -> R {
        f(&PriceContext::new(key))
    }
}
