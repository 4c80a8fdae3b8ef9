//! Key-Value strategy: one shared side table per value type
//!
//! Every (owner, attribute, key) triple is a row in a polymorphic table:
//!
//! | owner_id | owner_type | attribute | key | value |
//! |----------|------------|-----------|-----|-------|
//! | 1        | Post       | title     | usd | Ten   |
//!
//! Rows are loaded once per owner through the association and written back
//! when the owner is saved. Rows whose value is blank at save time are
//! deleted (or never inserted).

use std::collections::BTreeMap;
use std::sync::Arc;

use valuta_core::{AccessOptions, Key, Result, Value, ValueType};
use valuta_storage::{ColumnType, TableSchema};

use crate::backend::{present, stored_key, Backend};
use crate::naming::snake_case;
use crate::owner::{AssociationSpec, OwnerState, PriceRecord};

/// Strategy name
pub const STRATEGY: &str = "key_value";

/// Owner id column
pub const OWNER_ID_COLUMN: &str = "owner_id";
/// Owner type column
pub const OWNER_TYPE_COLUMN: &str = "owner_type";
/// Attribute name column
pub const ATTRIBUTE_COLUMN: &str = "attribute";
/// Key column
pub const KEY_COLUMN: &str = "key";
/// Value column
pub const VALUE_COLUMN: &str = "value";

/// Resolved Key-Value options, shared by every attribute on one association
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueConfig {
    /// Side-table addressing
    pub association: AssociationSpec,
    /// Type of the `value` column
    pub value_type: ValueType,
}

impl KeyValueConfig {
    /// Config for `table`, addressed through `association`
    pub fn new(
        association: impl Into<String>,
        table: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        Self {
            association: AssociationSpec {
                name: association.into(),
                table: table.into(),
                foreign_key: OWNER_ID_COLUMN.to_string(),
                owner_type_column: Some(OWNER_TYPE_COLUMN.to_string()),
            },
            value_type,
        }
    }

    /// Side table name
    pub fn table(&self) -> &str {
        &self.association.table
    }

    /// Schema the side table must have
    pub fn schema(&self) -> TableSchema {
        TableSchema::new(self.table())
            .column(OWNER_ID_COLUMN, ColumnType::Integer)
            .column(OWNER_TYPE_COLUMN, ColumnType::Text)
            .column(ATTRIBUTE_COLUMN, ColumnType::Text)
            .column(KEY_COLUMN, ColumnType::Text)
            .column(VALUE_COLUMN, self.value_type.into())
    }

    /// Join alias for one (owner type, attribute, key)
    ///
    /// Parts are joined with `.`, which neither identifiers nor keys contain,
    /// so distinct triples never share an alias.
    pub fn alias(&self, owner_type: &str, attribute: &str, key: &Key) -> String {
        format!(
            "{}.{}.{}.{}",
            snake_case(owner_type),
            attribute,
            key,
            self.association.name
        )
    }
}

/// Key-Value backend for one attribute
#[derive(Debug, Clone)]
pub struct KeyValueBackend {
    attribute: String,
    config: Arc<KeyValueConfig>,
}

impl KeyValueBackend {
    /// Backend for `attribute` on the association described by `config`
    pub fn new(attribute: impl Into<String>, config: Arc<KeyValueConfig>) -> Self {
        Self {
            attribute: attribute.into(),
            config,
        }
    }

    /// Shared configuration
    pub fn config(&self) -> &Arc<KeyValueConfig> {
        &self.config
    }

    fn owns(&self, record: &PriceRecord) -> bool {
        record.text_eq(ATTRIBUTE_COLUMN, &self.attribute)
    }

    /// Find or build the Price record for `key`
    fn price_for<'a>(&self, owner: &'a mut OwnerState, key: &Key) -> Result<&'a mut PriceRecord> {
        let association = owner.association(&self.config.association)?;
        Ok(association.find_or_build(
            |r| self.owns(r) && r.text_eq(KEY_COLUMN, key.as_str()),
            || {
                BTreeMap::from([
                    (ATTRIBUTE_COLUMN.to_string(), Value::from(self.attribute.as_str())),
                    (KEY_COLUMN.to_string(), Value::from(key.as_str())),
                ])
            },
        ))
    }
}

impl Backend for KeyValueBackend {
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
        Ok(present(self.price_for(owner, key)?.get(VALUE_COLUMN)))
    }

    fn write(
        &mut self,
        owner: &mut OwnerState,
        key: &Key,
        value: Value,
        _options: &AccessOptions,
    ) -> Result<Option<Value>> {
        let value = self.config.value_type.coerce(value)?;
        let stored = present(&value);
        self.price_for(owner, key)?.set(VALUE_COLUMN, value);
        Ok(stored)
    }

    fn each_key(&mut self, owner: &mut OwnerState, f: &mut dyn FnMut(&Key)) -> Result<()> {
        let keys: Vec<Key> = owner
            .association(&self.config.association)?
            .records()
            .iter()
            .filter(|r| self.owns(r) && r.get(VALUE_COLUMN).is_present())
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
                if self.owns(record) && record.get(VALUE_COLUMN).is_blank() {
                    record.mark_for_destruction();
                }
            }
        }
        Ok(())
    }
}
