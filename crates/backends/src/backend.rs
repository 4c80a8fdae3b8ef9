//! The backend contract
//!
//! A backend is bound to one (model, attribute) pair and one owner instance.
//! It reads and writes that attribute's value for a given key, walks the
//! keys that currently hold a value, and reacts to owner lifecycle events.
//!
//! All four storage strategies implement [`Backend`]; the cache layer is a
//! decorator over any of them (see [`crate::CachingBackend`]).

use tracing::warn;

use valuta_core::{AccessOptions, Key, LifecycleEvent, Result, Value};

use crate::owner::OwnerState;

/// Per-(model, attribute, owner) storage adapter
///
/// `read` is side-effect free with respect to storage: it may materialize
/// an in-memory Price record, but such a record is only persisted when the
/// owner is saved and is dropped again if its value is still blank.
pub trait Backend: Send {
    /// Attribute this backend serves
    fn attribute(&self) -> &str;

    /// Strategy name, for logging and errors
    fn strategy(&self) -> &'static str;

    /// Read the value stored for `key`; `None` when absent
    fn read(
        &mut self,
        owner: &mut OwnerState,
        key: &Key,
        options: &AccessOptions,
    ) -> Result<Option<Value>>;

    /// Write `value` for `key`, returning the stored value
    ///
    /// Writing NULL or a blank value marks the key absent; the backing
    /// Price record (if any) is deleted on the next save.
    fn write(
        &mut self,
        owner: &mut OwnerState,
        key: &Key,
        value: Value,
        options: &AccessOptions,
    ) -> Result<Option<Value>>;

    /// Call `f` once per key that currently holds a present value
    ///
    /// Keys are collected before the first call, so `f` never observes
    /// a partially iterated association.
    fn each_key(&mut self, owner: &mut OwnerState, f: &mut dyn FnMut(&Key)) -> Result<()>;

    /// Keys with a present value, in backend order
    fn keys(&mut self, owner: &mut OwnerState) -> Result<Vec<Key>> {
        let mut keys = Vec::new();
        self.each_key(owner, &mut |k| keys.push(k.clone()))?;
        Ok(keys)
    }

    /// Whether `key` holds a present (non-blank) value
    fn is_present(
        &mut self,
        owner: &mut OwnerState,
        key: &Key,
        options: &AccessOptions,
    ) -> Result<bool> {
        Ok(self
            .read(owner, key, options)?
            .map_or(false, |v| v.is_present()))
    }

    /// Hook run before the owner is persisted
    fn before_save(&mut self, _owner: &mut OwnerState) -> Result<()> {
        Ok(())
    }

    /// Owner lifecycle notification (save, reload, destroy)
    fn notify(&mut self, _event: LifecycleEvent) {}
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn attribute(&self) -> &str {
        (**self).attribute()
    }

    fn strategy(&self) -> &'static str {
        (**self).strategy()
    }

    fn read(
        &mut self,
        owner: &mut OwnerState,
        key: &Key,
        options: &AccessOptions,
    ) -> Result<Option<Value>> {
        (**self).read(owner, key, options)
    }

    fn write(
        &mut self,
        owner: &mut OwnerState,
        key: &Key,
        value: Value,
        options: &AccessOptions,
    ) -> Result<Option<Value>> {
        (**self).write(owner, key, value, options)
    }

    fn each_key(&mut self, owner: &mut OwnerState, f: &mut dyn FnMut(&Key)) -> Result<()> {
        (**self).each_key(owner, f)
    }

    fn keys(&mut self, owner: &mut OwnerState) -> Result<Vec<Key>> {
        (**self).keys(owner)
    }

    fn is_present(
        &mut self,
        owner: &mut OwnerState,
        key: &Key,
        options: &AccessOptions,
    ) -> Result<bool> {
        (**self).is_present(owner, key, options)
    }

    fn before_save(&mut self, owner: &mut OwnerState) -> Result<()> {
        (**self).before_save(owner)
    }

    fn notify(&mut self, event: LifecycleEvent) {
        (**self).notify(event)
    }
}

/// Map a stored cell to a read result: NULL reads as absent
pub(crate) fn present(value: &Value) -> Option<Value> {
    if value.is_null() {
        None
    } else {
        Some(value.clone())
    }
}

/// Parse a key read back from storage, skipping (and logging) malformed ones
pub(crate) fn stored_key(raw: &str, attribute: &str) -> Option<Key> {
    match Key::new(raw) {
        Ok(key) => Some(key),
        Err(reason) => {
            warn!(
                target: "valuta::backend",
                attribute,
                key = raw,
                %reason,
                "Skipping stored key"
            );
            None
        }
    }
}
