//! Attribute declaration: options, validation and backend descriptors
//!
//! Declaring keyed attributes on a model goes through [`configure`], which
//! resolves every option to a concrete [`BackendDescriptor`] up front.
//! Missing required options and forbidden combinations are reported here,
//! at declaration time, never deferred to first use.
//!
//! Key-Value and Table attributes that name the same association share one
//! configuration object. For Table attributes that is what lets a query
//! touching several of them join the price table once per key.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use valuta_core::{Error, KeySet, Result, ValueType};
use valuta_storage::{ColumnDef, ColumnType, SchemaRequirement};

use crate::backend::Backend;
use crate::cache::CachingBackend;
use crate::column::{self, ColumnBackend};
use crate::hash_valued::{self, HashFormat, HashValuedBackend};
use crate::key_value::{self, KeyValueBackend, KeyValueConfig};
use crate::naming::{is_identifier, singularize, snake_case};
use crate::owner::AssociationSpec;
use crate::table::{self, TableBackend, TableConfig};

// ============================================================================
// Options
// ============================================================================

/// Storage strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One owner column per key
    Column,
    /// One JSON column per attribute
    Json,
    /// One text-valued hash column per attribute
    Hstore,
    /// Shared polymorphic side table
    KeyValue,
    /// Dedicated per-model price table
    Table,
}

impl Strategy {
    /// Strategy name
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Column => column::STRATEGY,
            Strategy::Json | Strategy::Hstore => hash_valued::STRATEGY,
            Strategy::KeyValue => key_value::STRATEGY,
            Strategy::Table => table::STRATEGY,
        }
    }

    /// Whether the strategy cannot run without the cache layer
    pub fn requires_cache(&self) -> bool {
        matches!(self, Strategy::KeyValue | Strategy::Table)
    }
}

/// Options passed when declaring an attribute
///
/// Every field is optional; `None` means "use the default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendOptions {
    /// Strategy (falls back to the model-wide default)
    pub strategy: Option<Strategy>,
    /// Wrap the backend in the cache layer (falls back to the default)
    pub cache: Option<bool>,
    /// Value type (Key-Value table selection, column types)
    pub value_type: Option<ValueType>,
    /// Association name (Key-Value and Table)
    pub association_name: Option<String>,
    /// Side table name (Key-Value and Table)
    pub table_name: Option<String>,
    /// Owner foreign key on the price table (Table)
    pub foreign_key: Option<String>,
    /// Hash column prefix (Json and Hstore)
    pub column_prefix: Option<String>,
    /// Hash column suffix (Json and Hstore)
    pub column_suffix: Option<String>,
}

impl BackendOptions {
    /// Options selecting `strategy`
    pub fn strategy(strategy: Strategy) -> Self {
        Self {
            strategy: Some(strategy),
            ..Self::default()
        }
    }

    /// Column strategy
    pub fn column() -> Self {
        Self::strategy(Strategy::Column)
    }

    /// JSON hash column
    pub fn json() -> Self {
        Self::strategy(Strategy::Json)
    }

    /// Hstore hash column
    pub fn hstore() -> Self {
        Self::strategy(Strategy::Hstore)
    }

    /// Key-Value strategy on the shared table for `value_type`
    pub fn key_value(value_type: ValueType) -> Self {
        Self::strategy(Strategy::KeyValue).with_value_type(value_type)
    }

    /// Table strategy
    pub fn table() -> Self {
        Self::strategy(Strategy::Table)
    }

    /// Set the value type
    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    /// Set the cache flag
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the association name
    pub fn with_association(mut self, name: impl Into<String>) -> Self {
        self.association_name = Some(name.into());
        self
    }

    /// Set the side table name
    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Set the owner foreign key
    pub fn with_foreign_key(mut self, name: impl Into<String>) -> Self {
        self.foreign_key = Some(name.into());
        self
    }

    /// Set the hash column affix
    pub fn with_affix(mut self, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        self.column_prefix = Some(prefix.into());
        self.column_suffix = Some(suffix.into());
        self
    }
}

/// Model-wide defaults applied during declaration
#[derive(Debug, Clone)]
pub struct DeclarationDefaults {
    /// Strategy when an attribute names none
    pub strategy: Strategy,
    /// Cache flag when an attribute names none
    pub cache: bool,
    /// Allowed keys
    pub keys: Arc<KeySet>,
}

impl Default for DeclarationDefaults {
    fn default() -> Self {
        Self {
            strategy: Strategy::KeyValue,
            cache: true,
            keys: Arc::new(KeySet::default()),
        }
    }
}

/// The owner model being declared on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    /// Owner type tag (e.g. `Post`)
    pub type_name: String,
    /// Owner table (e.g. `posts`)
    pub table: String,
}

impl ModelInfo {
    /// Describe a model
    pub fn new(type_name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            table: table.into(),
        }
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// Fully resolved storage for one attribute
#[derive(Debug, Clone)]
pub enum BackendDescriptor {
    /// Column strategy
    Column {
        /// Column value type
        value_type: ValueType,
        /// Keys whose columns are requested at migration
        keys: Arc<KeySet>,
    },
    /// Json / Hstore strategy
    HashValued {
        /// Owner column holding the map
        column: String,
        /// Storage format
        format: HashFormat,
    },
    /// Key-Value strategy
    KeyValue(Arc<KeyValueConfig>),
    /// Table strategy
    Table(Arc<TableConfig>),
}

/// A declared attribute
#[derive(Debug, Clone)]
pub struct AttributeDescriptor {
    /// Attribute name
    pub name: String,
    /// Resolved storage
    pub backend: BackendDescriptor,
    /// Whether backends are wrapped in the cache layer
    pub cache: bool,
}

impl AttributeDescriptor {
    /// Strategy name
    pub fn strategy(&self) -> &'static str {
        match &self.backend {
            BackendDescriptor::Column { .. } => column::STRATEGY,
            BackendDescriptor::HashValued { .. } => hash_valued::STRATEGY,
            BackendDescriptor::KeyValue(_) => key_value::STRATEGY,
            BackendDescriptor::Table(_) => table::STRATEGY,
        }
    }

    /// Side-table association, for Key-Value and Table attributes
    pub fn association(&self) -> Option<&AssociationSpec> {
        match &self.backend {
            BackendDescriptor::KeyValue(config) => Some(&config.association),
            BackendDescriptor::Table(config) => Some(&config.association),
            _ => None,
        }
    }

    /// Build a backend instance for one owner
    pub fn instantiate(&self) -> Box<dyn Backend> {
        let name = self.name.clone();
        let backend: Box<dyn Backend> = match &self.backend {
            BackendDescriptor::Column { value_type, .. } => {
                Box::new(ColumnBackend::new(name, *value_type))
            }
            BackendDescriptor::HashValued { column, format } => {
                Box::new(HashValuedBackend::new(name, column.clone(), *format))
            }
            BackendDescriptor::KeyValue(config) => {
                Box::new(KeyValueBackend::new(name, config.clone()))
            }
            BackendDescriptor::Table(config) => Box::new(TableBackend::new(name, config.clone())),
        };
        if self.cache {
            Box::new(CachingBackend::new(backend))
        } else {
            backend
        }
    }

    /// Storage this attribute needs the host to materialize
    pub fn requirements(&self, model: &ModelInfo) -> Vec<SchemaRequirement> {
        match &self.backend {
            BackendDescriptor::Column { value_type, keys } => vec![SchemaRequirement::Columns {
                table: model.table.clone(),
                columns: keys
                    .iter()
                    .map(|key| ColumnDef::new(column::column_name(&self.name, key), (*value_type).into()))
                    .collect(),
            }],
            BackendDescriptor::HashValued { column, .. } => vec![SchemaRequirement::Columns {
                table: model.table.clone(),
                columns: vec![ColumnDef::new(column.clone(), ColumnType::Hash)],
            }],
            BackendDescriptor::KeyValue(config) => vec![SchemaRequirement::Table(config.schema())],
            BackendDescriptor::Table(config) => vec![SchemaRequirement::Table(config.schema())],
        }
    }
}

// ============================================================================
// Declaration
// ============================================================================

/// Intermediate Table grouping while declarations are resolved
struct TableGroup {
    table: String,
    foreign_key: String,
    attributes: Vec<(String, ValueType)>,
}

enum Resolved {
    Ready(BackendDescriptor),
    Table(String),
}

/// Resolve attribute declarations into descriptors
///
/// `declarations` are `(attribute, options)` pairs in declaration order.
/// The returned descriptors keep that order.
pub fn configure(
    model: &ModelInfo,
    declarations: &[(String, BackendOptions)],
    defaults: &DeclarationDefaults,
) -> Result<Vec<AttributeDescriptor>> {
    if !is_identifier(&model.table) {
        return Err(Error::InvalidOperation(format!(
            "invalid owner table name '{}'",
            model.table
        )));
    }

    let mut seen = BTreeSet::new();
    let mut key_values: BTreeMap<String, Arc<KeyValueConfig>> = BTreeMap::new();
    let mut tables: BTreeMap<String, TableGroup> = BTreeMap::new();
    let mut resolved = Vec::with_capacity(declarations.len());

    for (attribute, options) in declarations {
        if !is_identifier(attribute) {
            return Err(Error::misconfigured(attribute, "attribute name is not an identifier"));
        }
        if !seen.insert(attribute.as_str()) {
            return Err(Error::misconfigured(attribute, "attribute declared twice"));
        }

        let strategy = options.strategy.unwrap_or(defaults.strategy);
        let cache = options.cache.unwrap_or(defaults.cache);
        if strategy.requires_cache() && !cache {
            return Err(Error::CacheRequired {
                attribute: attribute.clone(),
                strategy: strategy.as_str(),
            });
        }

        let backend = match strategy {
            Strategy::Column => Resolved::Ready(BackendDescriptor::Column {
                value_type: options.value_type.unwrap_or(ValueType::Text),
                keys: defaults.keys.clone(),
            }),
            Strategy::Json | Strategy::Hstore => {
                let column = hash_valued::column_name(
                    attribute,
                    options.column_prefix.as_deref().unwrap_or(""),
                    options.column_suffix.as_deref().unwrap_or(""),
                );
                check_identifier(attribute, "column", &column)?;
                let format = if strategy == Strategy::Json {
                    HashFormat::Json
                } else {
                    HashFormat::Hstore
                };
                Resolved::Ready(BackendDescriptor::HashValued { column, format })
            }
            Strategy::KeyValue => {
                let config = key_value_config(attribute, options)?;
                if tables.contains_key(&config.association.name) {
                    return Err(association_conflict(attribute, &config.association.name));
                }
                let shared = match key_values.get(&config.association.name) {
                    Some(existing) if **existing == config => existing.clone(),
                    Some(_) => return Err(association_conflict(attribute, &config.association.name)),
                    None => {
                        let shared = Arc::new(config);
                        key_values.insert(shared.association.name.clone(), shared.clone());
                        shared
                    }
                };
                Resolved::Ready(BackendDescriptor::KeyValue(shared))
            }
            Strategy::Table => {
                let association = options
                    .association_name
                    .clone()
                    .unwrap_or_else(|| "prices".to_string());
                let table = options
                    .table_name
                    .clone()
                    .unwrap_or_else(|| format!("{}_prices", singularize(&model.table)));
                let foreign_key = options
                    .foreign_key
                    .clone()
                    .unwrap_or_else(|| format!("{}_id", snake_case(&model.type_name)));
                check_identifier(attribute, "association", &association)?;
                check_identifier(attribute, "table", &table)?;
                check_identifier(attribute, "foreign key", &foreign_key)?;
                if attribute == table::KEY_COLUMN || *attribute == foreign_key {
                    return Err(Error::misconfigured(
                        attribute,
                        "attribute name collides with a price table column",
                    ));
                }
                if key_values.contains_key(&association) {
                    return Err(association_conflict(attribute, &association));
                }

                let value_type = options.value_type.unwrap_or(ValueType::Text);
                match tables.get_mut(&association) {
                    Some(group) if group.table == table && group.foreign_key == foreign_key => {
                        group.attributes.push((attribute.clone(), value_type));
                    }
                    Some(_) => return Err(association_conflict(attribute, &association)),
                    None => {
                        tables.insert(
                            association.clone(),
                            TableGroup {
                                table,
                                foreign_key,
                                attributes: vec![(attribute.clone(), value_type)],
                            },
                        );
                    }
                }
                Resolved::Table(association)
            }
        };
        resolved.push((attribute.clone(), backend, cache));
    }

    let table_configs: BTreeMap<String, Arc<TableConfig>> = tables
        .into_iter()
        .map(|(association, group)| {
            let config = group.attributes.into_iter().fold(
                TableConfig::new(association.clone(), group.table, group.foreign_key),
                |config, (name, vt)| config.attribute(name, vt),
            );
            (association, Arc::new(config))
        })
        .collect();

    let mut descriptors = Vec::with_capacity(resolved.len());
    for (name, backend, cache) in resolved {
        let backend = match backend {
            Resolved::Ready(backend) => backend,
            Resolved::Table(association) => match table_configs.get(&association) {
                Some(config) => BackendDescriptor::Table(config.clone()),
                None => return Err(Error::misconfigured(&name, "unresolved table association")),
            },
        };
        debug!(
            target: "valuta::backend",
            model = %model.type_name,
            attribute = %name,
            cache,
            "Attribute declared"
        );
        descriptors.push(AttributeDescriptor {
            name,
            backend,
            cache,
        });
    }
    Ok(descriptors)
}

fn key_value_config(attribute: &str, options: &BackendOptions) -> Result<KeyValueConfig> {
    if options.value_type.is_none() && options.table_name.is_none() {
        return Err(Error::misconfigured(
            attribute,
            "key_value requires value_type or table_name",
        ));
    }
    let value_type = options.value_type.unwrap_or(ValueType::Text);
    let association = options
        .association_name
        .clone()
        .unwrap_or_else(|| format!("{}_prices", value_type.as_str()));
    let table = options
        .table_name
        .clone()
        .unwrap_or_else(|| format!("valuta_{}_prices", value_type.as_str()));
    check_identifier(attribute, "association", &association)?;
    check_identifier(attribute, "table", &table)?;
    Ok(KeyValueConfig::new(association, table, value_type))
}

fn check_identifier(attribute: &str, what: &str, name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(Error::misconfigured(
            attribute,
            format!("{} '{}' is not a valid identifier", what, name),
        ))
    }
}

fn association_conflict(attribute: &str, association: &str) -> Error {
    Error::misconfigured(
        attribute,
        format!(
            "association '{}' is already declared with different options",
            association
        ),
    )
}
