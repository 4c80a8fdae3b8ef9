//! In-memory tables and rows

use std::collections::BTreeMap;

use valuta_core::{Error, Result, RowId, Value};

use crate::schema::{TableSchema, ID_COLUMN};

/// Equality filter: every `(column, value)` pair must match
pub type Filter<'a> = &'a [(&'a str, Value)];

static NULL: Value = Value::Null;

/// A stored row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Primary key
    pub id: RowId,
    /// Cell values by column name; missing cells read as NULL
    pub cells: BTreeMap<String, Value>,
}

impl Row {
    /// Borrow a cell, NULL when absent
    pub fn get(&self, column: &str) -> &Value {
        self.cells.get(column).unwrap_or(&NULL)
    }

    /// Cell value including the implicit `id` column
    pub fn value(&self, column: &str) -> Value {
        if column == ID_COLUMN {
            Value::from(self.id)
        } else {
            self.get(column).clone()
        }
    }

    /// Whether every filter pair matches (SQL equality, NULL never matches)
    pub fn matches(&self, filter: Filter<'_>) -> bool {
        filter
            .iter()
            .all(|(column, expected)| self.value(column).sql_eq(expected) == Some(true))
    }
}

/// A table: schema plus rows ordered by id
#[derive(Debug, Clone)]
pub struct Table {
    pub(crate) schema: TableSchema,
    pub(crate) rows: BTreeMap<RowId, Row>,
    next_id: u64,
}

impl Table {
    /// Create an empty table
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Table schema
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Validate that every cell names a known column with a compatible value
    pub(crate) fn check_cells(&self, cells: &BTreeMap<String, Value>) -> Result<()> {
        for (column, value) in cells {
            let def = self
                .schema
                .get(column)
                .ok_or_else(|| Error::unknown_column(&self.schema.name, column))?;
            if !def.ty.accepts(value) {
                return Err(Error::TypeMismatch {
                    expected: def.ty.as_str(),
                    actual: value.type_name(),
                });
            }
        }
        Ok(())
    }

    /// Validate filter column names
    pub(crate) fn check_filter(&self, filter: Filter<'_>) -> Result<()> {
        for (column, _) in filter {
            if !self.schema.has_column(column) {
                return Err(Error::unknown_column(&self.schema.name, *column));
            }
        }
        Ok(())
    }

    pub(crate) fn insert(&mut self, cells: BTreeMap<String, Value>) -> Result<RowId> {
        self.check_cells(&cells)?;
        let id = RowId::new(self.next_id);
        self.next_id += 1;
        self.rows.insert(id, Row { id, cells });
        Ok(id)
    }

    pub(crate) fn update(&mut self, id: RowId, cells: BTreeMap<String, Value>) -> Result<()> {
        self.check_cells(&cells)?;
        let row = self.rows.get_mut(&id).ok_or_else(|| Error::RowNotFound {
            table: self.schema.name.clone(),
            id,
        })?;
        row.cells.extend(cells);
        Ok(())
    }

    pub(crate) fn select(&self, filter: Filter<'_>) -> Vec<Row> {
        self.rows
            .values()
            .filter(|row| row.matches(filter))
            .cloned()
            .collect()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
