//! Per-attribute accessors
//!
//! An [`Accessor`] is the reader / writer / presence / key-iteration set
//! for one declared attribute on one record. It borrows the record's
//! backend for that attribute and the owner state together, so calls go
//! straight to the backend without any lookup by name.

use valuta_backends::{Backend, OwnerState};
use valuta_core::{AccessOptions, Key, KeySet, Result, Value};

use crate::context::PriceContext;

/// Typed access to one attribute of one record
pub struct Accessor<'a> {
    attribute: &'a str,
    backend: &'a mut dyn Backend,
    owner: &'a mut OwnerState,
    keys: &'a KeySet,
}

impl<'a> Accessor<'a> {
    pub(crate) fn new(
        attribute: &'a str,
        backend: &'a mut dyn Backend,
        owner: &'a mut OwnerState,
        keys: &'a KeySet,
    ) -> Self {
        Self {
            attribute,
            backend,
            owner,
            keys,
        }
    }

    /// Attribute name
    pub fn attribute(&self) -> &str {
        self.attribute
    }

    /// Storage strategy name
    pub fn strategy(&self) -> &'static str {
        self.backend.strategy()
    }

    /// Value at `key`; `None` when absent
    pub fn get(&mut self, key: &Key) -> Result<Option<Value>> {
        self.get_with(key, &AccessOptions::default())
    }

    /// Value at `key` with explicit options
    pub fn get_with(&mut self, key: &Key, options: &AccessOptions) -> Result<Option<Value>> {
        self.keys.ensure(key)?;
        self.backend.read(self.owner, key, options)
    }

    /// Store `value` at `key`; a blank value clears the key
    pub fn set(&mut self, key: &Key, value: impl Into<Value>) -> Result<Option<Value>> {
        self.set_with(key, value.into(), &AccessOptions::default())
    }

    /// Store `value` at `key` with explicit options
    pub fn set_with(
        &mut self,
        key: &Key,
        value: Value,
        options: &AccessOptions,
    ) -> Result<Option<Value>> {
        self.keys.ensure(key)?;
        self.backend.write(self.owner, key, value, options)
    }

    /// Whether `key` holds a non-blank value
    pub fn is_present(&mut self, key: &Key) -> Result<bool> {
        self.keys.ensure(key)?;
        self.backend
            .is_present(self.owner, key, &AccessOptions::default())
    }

    /// Keys currently holding a value
    pub fn keys(&mut self) -> Result<Vec<Key>> {
        self.backend.keys(self.owner)
    }

    /// Value at the context's key
    pub fn get_in(&mut self, ctx: &PriceContext) -> Result<Option<Value>> {
        self.get(ctx.key())
    }

    /// Store `value` at the context's key
    pub fn set_in(&mut self, ctx: &PriceContext, value: impl Into<Value>) -> Result<Option<Value>> {
        self.set(ctx.key(), value)
    }

    /// Presence at the context's key
    pub fn is_present_in(&mut self, ctx: &PriceContext) -> Result<bool> {
        self.is_present(ctx.key())
    }
}

impl std::fmt::Debug for Accessor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessor")
            .field("attribute", &self.attribute)
            .field("strategy", &self.backend.strategy())
            .field("owner_id", &self.owner.id())
            .finish()
    }
}
