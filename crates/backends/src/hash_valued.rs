//! Hash-valued strategy: one structured column per attribute
//!
//! The column holds a `key -> value` map. Two formats exist:
//! - `Json` keeps scalar types as written
//! - `Hstore` stores every value as text, like a string-to-string hash
//!
//! Blank entries are stripped before the owner is saved, so a stored map
//! never carries an empty value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use valuta_core::{AccessOptions, Error, Key, Result, Value};

use crate::backend::{present, stored_key, Backend};
use crate::owner::OwnerState;

/// Strategy name
pub const STRATEGY: &str = "hash_valued";

/// Storage format of the hash column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashFormat {
    /// Typed JSON values
    Json,
    /// Text-only values
    Hstore,
}

impl HashFormat {
    /// Convert a written value into its stored form
    pub fn encode(&self, value: Value) -> Result<Value> {
        match (self, value) {
            (_, Value::Map(_)) => Err(Error::TypeMismatch {
                expected: "scalar",
                actual: "map",
            }),
            (HashFormat::Json, v) => Ok(v),
            (HashFormat::Hstore, Value::Null) => Ok(Value::Null),
            (HashFormat::Hstore, Value::Text(s)) => Ok(Value::Text(s)),
            (HashFormat::Hstore, v) => Ok(Value::Text(v.to_string())),
        }
    }
}

/// Column holding `attribute` under a `prefix`/`suffix` affix
pub fn column_name(attribute: &str, prefix: &str, suffix: &str) -> String {
    format!("{}{}{}", prefix, attribute, suffix)
}

/// Hash-valued backend
#[derive(Debug, Clone)]
pub struct HashValuedBackend {
    attribute: String,
    column: String,
    format: HashFormat,
}

impl HashValuedBackend {
    /// Backend for `attribute` stored in `column`
    pub fn new(attribute: impl Into<String>, column: impl Into<String>, format: HashFormat) -> Self {
        Self {
            attribute: attribute.into(),
            column: column.into(),
            format,
        }
    }

    /// Owner column backing this attribute
    pub fn column(&self) -> &str {
        &self.column
    }

    fn map(&self, owner: &OwnerState) -> BTreeMap<String, Value> {
        owner
            .read_column(&self.column)
            .and_then(Value::as_map)
            .cloned()
            .unwrap_or_default()
    }
}

impl Backend for HashValuedBackend {
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
        Ok(owner
            .read_column(&self.column)
            .and_then(Value::as_map)
            .and_then(|m| m.get(key.as_str()))
            .and_then(present))
    }

    fn write(
        &mut self,
        owner: &mut OwnerState,
        key: &Key,
        value: Value,
        _options: &AccessOptions,
    ) -> Result<Option<Value>> {
        let value = self.format.encode(value)?;
        let stored = present(&value);
        let mut map = self.map(owner);
        map.insert(key.to_string(), value);
        owner.write_column(&self.column, Value::Map(map))?;
        Ok(stored)
    }

    fn each_key(&mut self, owner: &mut OwnerState, f: &mut dyn FnMut(&Key)) -> Result<()> {
        let keys: Vec<Key> = self
            .map(owner)
            .into_iter()
            .filter(|(_, v)| v.is_present())
            .filter_map(|(k, _)| stored_key(&k, &self.attribute))
            .collect();
        for key in &keys {
            f(key);
        }
        Ok(())
    }

    fn before_save(&mut self, owner: &mut OwnerState) -> Result<()> {
        let Some(Value::Map(map)) = owner.read_column(&self.column) else {
            return Ok(());
        };
        if map.values().all(Value::is_present) {
            return Ok(());
        }
        let stripped: BTreeMap<String, Value> = map
            .iter()
            .filter(|(_, v)| v.is_present())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        owner.write_column(&self.column, Value::Map(stripped))
    }
}
