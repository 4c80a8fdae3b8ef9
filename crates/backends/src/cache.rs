//! Per-owner read/write cache decorator
//!
//! Wraps any [`Backend`] and memoizes results per key, including absent
//! ones. The cache is dropped on every owner lifecycle event, so a reload
//! or save always re-reads through the inner backend.

use std::collections::HashMap;

use tracing::trace;

use valuta_core::{AccessOptions, Key, LifecycleEvent, Result, Value};

use crate::backend::Backend;
use crate::owner::OwnerState;

/// Caching decorator
#[derive(Debug, Clone)]
pub struct CachingBackend<B> {
    inner: B,
    cache: HashMap<Key, Option<Value>>,
}

impl<B: Backend> CachingBackend<B> {
    /// Wrap `inner`
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            cache: HashMap::new(),
        }
    }

    /// Inner backend
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Number of cached keys
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached entry
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl<B: Backend> Backend for CachingBackend<B> {
    fn attribute(&self) -> &str {
        self.inner.attribute()
    }

    fn strategy(&self) -> &'static str {
        self.inner.strategy()
    }

    fn read(
        &mut self,
        owner: &mut OwnerState,
        key: &Key,
        options: &AccessOptions,
    ) -> Result<Option<Value>> {
        if options.bypass_cache {
            return self.inner.read(owner, key, options);
        }
        if let Some(cached) = self.cache.get(key) {
            trace!(
                target: "valuta::cache",
                attribute = %self.inner.attribute(),
                key = %key,
                "Cache hit"
            );
            return Ok(cached.clone());
        }
        let value = self.inner.read(owner, key, options)?;
        self.cache.insert(key.clone(), value.clone());
        Ok(value)
    }

    fn write(
        &mut self,
        owner: &mut OwnerState,
        key: &Key,
        value: Value,
        options: &AccessOptions,
    ) -> Result<Option<Value>> {
        let stored = self.inner.write(owner, key, value, options)?;
        if !options.bypass_cache {
            self.cache.insert(key.clone(), stored.clone());
        }
        Ok(stored)
    }

    fn each_key(&mut self, owner: &mut OwnerState, f: &mut dyn FnMut(&Key)) -> Result<()> {
        self.inner.each_key(owner, f)
    }

    fn before_save(&mut self, owner: &mut OwnerState) -> Result<()> {
        self.inner.before_save(owner)
    }

    fn notify(&mut self, event: LifecycleEvent) {
        if !self.cache.is_empty() {
            trace!(
                target: "valuta::cache",
                attribute = %self.inner.attribute(),
                ?event,
                entries = self.cache.len(),
                "Cache cleared"
            );
        }
        self.cache.clear();
        self.inner.notify(event);
    }
}
