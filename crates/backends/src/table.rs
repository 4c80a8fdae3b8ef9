//! Table strategy: one dedicated price table per model
//!
//! Each row holds one key for one owner, with a column per attribute:
//!
//! | post_id | key | title | amount |
//! |---------|-----|-------|--------|
//! | 1       | usd | Ten   | 10     |
//!
//! All attributes declared on the same association share its rows, so a
//! query touching several of them needs only one join per key. A row is
//! deleted on save once every attribute column on it is blank.

use std::collections::BTreeMap;
use std::sync::Arc;

use valuta_core::{AccessOptions, Key, Result, Value, ValueType};
use valuta_storage::{ColumnType, TableSchema};

use crate::backend::{present, stored_key, Backend};
use crate::owner::{AssociationSpec, OwnerState, PriceRecord};

/// Strategy name
pub const STRATEGY: &str = "table";

/// Key column
pub const KEY_COLUMN: &str = "key";

/// Resolved Table options, shared by every attribute on one association
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    /// Price-table addressing (foreign key, no owner type)
    pub association: AssociationSpec,
    /// Attribute columns on the price table, in declaration order
    pub attributes: Vec<(String, ValueType)>,
}

impl TableConfig {
    /// Config for `table` joined on `foreign_key`
    pub fn new(
        association: impl Into<String>,
        table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            association: AssociationSpec {
                name: association.into(),
                table: table.into(),
                foreign_key: foreign_key.into(),
                owner_type_column: None,
            },
            attributes: Vec::new(),
        }
    }

    /// Builder-style attribute column
    pub fn attribute(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.attributes.push((name.into(), value_type));
        self
    }

    /// Price table name
    pub fn table(&self) -> &str {
        &self.association.table
    }

    /// Schema the price table must have
    pub fn schema(&self) -> TableSchema {
        let schema = TableSchema::new(self.table())
            .column(&self.association.foreign_key, ColumnType::Integer)
            .column(KEY_COLUMN, ColumnType::Text);
        self.attributes
            .iter()
            .fold(schema, |s, (name, vt)| s.column(name, (*vt).into()))
    }

    /// Join alias for one key: shared by every attribute on this table
    pub fn alias(&self, key: &Key) -> String {
        format!("{}.{}", self.table(), key)
    }

    fn value_type(&self, attribute: &str) -> ValueType {
        self.attributes
            .iter()
            .find(|(name, _)| name == attribute)
            .map_or(ValueType::Text, |(_, vt)| *vt)
    }

    fn is_empty_record(&self, record: &PriceRecord) -> bool {
        self.attributes
            .iter()
            .all(|(name, _)| record.get(name).is_blank())
    }
}

/// Table backend for one attribute
#[derive(Debug, Clone)]
pub struct TableBackend {
    attribute: String,
    value_type: ValueType,
    config: Arc<TableConfig>,
}

impl TableBackend {
    /// Backend for `attribute`, one of the columns in `config`
    pub fn new(attribute: impl Into<String>, config: Arc<TableConfig>) -> Self {
        let attribute = attribute.into();
        let value_type = config.value_type(&attribute);
        Self {
            attribute,
            value_type,
            config,
        }
    }

    /// Shared configuration
    pub fn config(&self) -> &Arc<TableConfig> {
        &self.config
    }

    fn price_for<'a>(&self, owner: &'a mut OwnerState, key: &Key) -> Result<&'a mut PriceRecord> {
        let association = owner.association(&self.config.association)?;
        Ok(association.find_or_build(
            |r| r.text_eq(KEY_COLUMN, key.as_str()),
            || BTreeMap::from([(KEY_COLUMN.to_string(), Value::from(key.as_str()))]),
        ))
    }
}

impl Backend for TableBackend {
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
        Ok(present(self.price_for(owner, key)?.get(&self.attribute)))
    }

    fn write(
        &mut self,
        owner: &mut OwnerState,
        key: &Key,
        value: Value,
        _options: &AccessOptions,
    ) -> Result<Option<Value>> {
        let value = self.value_type.coerce(value)?;
        let stored = present(&value);
        let attribute = self.attribute.clone();
        self.price_for(owner, key)?.set(attribute, value);
        Ok(stored)
    }

    fn each_key(&mut self, owner: &mut OwnerState, f: &mut dyn FnMut(&Key)) -> Result<()> {
        let keys: Vec<Key> = owner
            .association(&self.config.association)?
            .records()
            .iter()
            .filter(|r| r.get(&self.attribute).is_present())
            .filter_map(|r| r.get(KEY_COLUMN).as_text())
            .filter_map(|k| stored_key(k, &self.attribute))
            .collect();
        for key in &keys {
            f(key);
        }
        Ok(())
    }

    fn before_save(&mut self, owner: &mut OwnerState) -> Result<()> {
        if let Some(association) = owner.loaded_association(&self.config.association.name) {
            for record in association.records_mut() {
                if self.config.is_empty_record(record) {
                    record.mark_for_destruction();
                }
            }
        }
        Ok(())
    }
}
