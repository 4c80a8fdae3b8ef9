//! Table schemas and schema requirements
//!
//! Backends never create tables themselves. At declaration time they
//! describe what they need as [`SchemaRequirement`]s; the host applies them
//! with [`crate::Database::apply`].

use serde::{Deserialize, Serialize};

use valuta_core::{Error, Result, Value, ValueType};

/// Name of the implicit primary key column
pub const ID_COLUMN: &str = "id";

/// Column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Signed integer
    Integer,
    /// Float
    Float,
    /// Text
    Text,
    /// Structured hash / JSON map
    Hash,
}

impl ColumnType {
    /// Whether `value` may be stored in a column of this type
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (ColumnType::Integer, Value::Int(_))
                | (ColumnType::Float, Value::Float(_) | Value::Int(_))
                | (ColumnType::Text, Value::Text(_))
                | (ColumnType::Hash, Value::Map(_))
        )
    }

    /// Name for error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
            ColumnType::Hash => "hash",
        }
    }
}

impl From<ValueType> for ColumnType {
    fn from(vt: ValueType) -> Self {
        match vt {
            ValueType::Integer => ColumnType::Integer,
            ValueType::Float => ColumnType::Float,
            ValueType::Text => ColumnType::Text,
        }
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Column type
    pub ty: ColumnType,
}

impl ColumnDef {
    /// Create a column definition
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Table schema (the `id` column is implicit)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name
    pub name: String,
    /// Declared columns in order
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Create a schema with no columns
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Builder-style column addition
    pub fn column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.push(ColumnDef::new(name, ty));
        self
    }

    /// Look up a column
    pub fn get(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether the table has a column (including `id`)
    pub fn has_column(&self, name: &str) -> bool {
        name == ID_COLUMN || self.get(name).is_some()
    }

    /// Add a column if it is missing
    ///
    /// Returns `true` when the column was added. Redefining an existing
    /// column with a different type is an error.
    pub fn ensure_column(&mut self, def: &ColumnDef) -> Result<bool> {
        match self.get(&def.name) {
            Some(existing) if existing.ty == def.ty => Ok(false),
            Some(existing) => Err(Error::InvalidOperation(format!(
                "column '{}' on '{}' already exists as {}, requested {}",
                def.name,
                self.name,
                existing.ty.as_str(),
                def.ty.as_str()
            ))),
            None => {
                self.columns.push(def.clone());
                Ok(true)
            }
        }
    }
}

/// What a backend needs the host to materialize
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaRequirement {
    /// A whole table (created if missing, missing columns added otherwise)
    Table(TableSchema),
    /// Extra columns on an existing table (typically the owner table)
    Columns {
        /// Table name
        table: String,
        /// Columns to add
        columns: Vec<ColumnDef>,
    },
}

impl SchemaRequirement {
    /// Table this requirement applies to
    pub fn table(&self) -> &str {
        match self {
            SchemaRequirement::Table(schema) => &schema.name,
            SchemaRequirement::Columns { table, .. } => table,
        }
    }
}
