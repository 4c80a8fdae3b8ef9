//! Column strategy: one owner-table column per (attribute, key)
//!
//! `price` in `usd` lives in `price_usd`. Supporting a new key is a matter
//! of adding its column; key discovery scans the owner table's columns for
//! `<attribute>_<key>` where the key part is a normalized key without `_`.
//! Keys containing `_` stay readable and writable but are not discovered,
//! so `price_net_usd` never shows up as a key of `price`.

use tracing::debug;

use valuta_core::{AccessOptions, Key, Result, Value, ValueType};

use crate::backend::{present, Backend};
use crate::owner::OwnerState;

/// Strategy name
pub const STRATEGY: &str = "column";

/// Owner column holding `attribute` in `key`
pub fn column_name(attribute: &str, key: &Key) -> String {
    format!("{}_{}", attribute, key)
}

/// Column-strategy backend
#[derive(Debug, Clone)]
pub struct ColumnBackend {
    attribute: String,
    value_type: ValueType,
}

impl ColumnBackend {
    /// Backend for `attribute`
    pub fn new(attribute: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            attribute: attribute.into(),
            value_type,
        }
    }

    fn column(&self, key: &Key) -> String {
        column_name(&self.attribute, key)
    }

    /// Keys that have a column on the owner table, ascending
    fn mapped_keys(&self, owner: &OwnerState) -> Vec<Key> {
        let prefix = format!("{}_", self.attribute);
        let mut keys: Vec<Key> = owner
            .column_names()
            .iter()
            .filter_map(|name| name.strip_prefix(&prefix))
            .filter_map(discoverable_key)
            .collect();
        keys.sort();
        keys
    }
}

/// Key named by a column suffix, if the suffix is exactly a key without `_`
fn discoverable_key(suffix: &str) -> Option<Key> {
    if suffix.contains('_') {
        return None;
    }
    Key::new(suffix).ok().filter(|key| key.as_str() == suffix)
}

impl Backend for ColumnBackend {
    fn attribute(&self) -> &str {
        &self.attribute
    }

    fn strategy(&self) -> &'static str {
        STRATEGY
    }

    fn read(
        &mut self,
        owner: &mut OwnerState,
        key: &Key,
        _options: &AccessOptions,
    ) -> Result<Option<Value>> {
        Ok(owner.read_column(&self.column(key)).and_then(present))
    }

    fn write(
        &mut self,
        owner: &mut OwnerState,
        key: &Key,
        value: Value,
        _options: &AccessOptions,
    ) -> Result<Option<Value>> {
        let column = self.column(key);
        if !owner.has_column(&column) {
            debug!(
                target: "valuta::backend",
                attribute = %self.attribute,
                key = %key,
                "No column for key, write ignored"
            );
            return Ok(None);
        }
        let value = self.value_type.coerce(value)?;
        let stored = present(&value);
        owner.write_column(&column, value)?;
        Ok(stored)
    }

    fn each_key(&mut self, owner: &mut OwnerState, f: &mut dyn FnMut(&Key)) -> Result<()> {
        let keys: Vec<Key> = self
            .mapped_keys(owner)
            .into_iter()
            .filter(|key| {
                owner
                    .read_column(&self.column(key))
                    .map_or(false, Value::is_present)
            })
            .collect();
        for key in &keys {
            f(key);
        }
        Ok(())
    }
}
