//! Database: named tables behind a `parking_lot::RwLock`
//!
//! Shared as `Arc<Database>` between owner instances and queries. Each
//! call takes the lock once; there are no multi-statement transactions.
//!
//! # Statistics
//!
//! Every call bumps an atomic counter in [`DatabaseStats`]. Tests use the
//! counters to assert how many round-trips an operation made.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use valuta_core::{Error, Result, RowId, Value};

use crate::schema::{SchemaRequirement, TableSchema};
use crate::select::{execute as execute_select, Select};
use crate::table::{Filter, Row, Table};

/// Round-trip counters
#[derive(Debug, Default)]
pub struct DatabaseStats {
    selects: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
}

/// Point-in-time copy of [`DatabaseStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// `get`, `select_where` and `execute` calls
    pub selects: u64,
    /// `insert` calls
    pub inserts: u64,
    /// `update` calls
    pub updates: u64,
    /// `delete` and `delete_where` calls
    pub deletes: u64,
}

impl DatabaseStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            selects: self.selects.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        }
    }
}

/// In-memory relational store
#[derive(Debug, Default)]
pub struct Database {
    tables: RwLock<BTreeMap<String, Table>>,
    stats: DatabaseStats,
}

impl Database {
    /// Create an empty database
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Schema ==========

    /// Create a table; error if it already exists
    pub fn create_table(&self, schema: TableSchema) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.contains_key(&schema.name) {
            return Err(Error::InvalidOperation(format!(
                "table '{}' already exists",
                schema.name
            )));
        }
        debug!(target: "valuta::storage", table = %schema.name, "Table created");
        tables.insert(schema.name.clone(), Table::new(schema));
        Ok(())
    }

    /// Materialize a schema requirement (idempotent)
    ///
    /// Tables are created when missing; missing columns are added to
    /// existing tables. A `Columns` requirement on a missing table errors.
    pub fn apply(&self, requirement: &SchemaRequirement) -> Result<()> {
        let mut tables = self.tables.write();
        match requirement {
            SchemaRequirement::Table(schema) => match tables.get_mut(&schema.name) {
                Some(table) => {
                    for def in &schema.columns {
                        table.schema.ensure_column(def)?;
                    }
                }
                None => {
                    debug!(target: "valuta::storage", table = %schema.name, "Table created");
                    tables.insert(schema.name.clone(), Table::new(schema.clone()));
                }
            },
            SchemaRequirement::Columns { table, columns } => {
                let t = tables
                    .get_mut(table)
                    .ok_or_else(|| Error::UnknownTable(table.clone()))?;
                for def in columns {
                    if t.schema.ensure_column(def)? {
                        debug!(target: "valuta::storage", table = %table, column = %def.name, "Column added");
                    }
                }
            }
        }
        Ok(())
    }

    /// Apply several requirements in order
    pub fn apply_all<'a, I>(&self, requirements: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a SchemaRequirement>,
    {
        for requirement in requirements {
            self.apply(requirement)?;
        }
        Ok(())
    }

    /// Whether a table exists
    pub fn has_table(&self, table: &str) -> bool {
        self.tables.read().contains_key(table)
    }

    /// Column names of a table (without `id`), in declaration order
    pub fn column_names(&self, table: &str) -> Result<Vec<String>> {
        let tables = self.tables.read();
        let t = tables
            .get(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))?;
        Ok(t.schema.columns.iter().map(|c| c.name.clone()).collect())
    }

    /// Schema of a table
    pub fn schema(&self, table: &str) -> Result<TableSchema> {
        let tables = self.tables.read();
        tables
            .get(table)
            .map(|t| t.schema.clone())
            .ok_or_else(|| Error::UnknownTable(table.to_string()))
    }

    // ========== Rows ==========

    /// Insert a row, returning its id
    pub fn insert(&self, table: &str, cells: BTreeMap<String, Value>) -> Result<RowId> {
        DatabaseStats::bump(&self.stats.inserts);
        let mut tables = self.tables.write();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))?;
        t.insert(cells)
    }

    /// Overwrite the given cells of an existing row
    pub fn update(&self, table: &str, id: RowId, cells: BTreeMap<String, Value>) -> Result<()> {
        DatabaseStats::bump(&self.stats.updates);
        let mut tables = self.tables.write();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))?;
        t.update(id, cells)
    }

    /// Delete a row; returns whether it existed
    pub fn delete(&self, table: &str, id: RowId) -> Result<bool> {
        DatabaseStats::bump(&self.stats.deletes);
        let mut tables = self.tables.write();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))?;
        Ok(t.rows.remove(&id).is_some())
    }

    /// Delete every row matching `filter`; returns the count
    pub fn delete_where(&self, table: &str, filter: Filter<'_>) -> Result<usize> {
        DatabaseStats::bump(&self.stats.deletes);
        let mut tables = self.tables.write();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))?;
        t.check_filter(filter)?;
        let before = t.rows.len();
        t.rows.retain(|_, row| !row.matches(filter));
        Ok(before - t.rows.len())
    }

    /// Fetch a row by id
    pub fn get(&self, table: &str, id: RowId) -> Result<Option<Row>> {
        DatabaseStats::bump(&self.stats.selects);
        let tables = self.tables.read();
        let t = tables
            .get(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))?;
        Ok(t.rows.get(&id).cloned())
    }

    /// Rows matching an equality filter, ascending id
    pub fn select_where(&self, table: &str, filter: Filter<'_>) -> Result<Vec<Row>> {
        DatabaseStats::bump(&self.stats.selects);
        let tables = self.tables.read();
        let t = tables
            .get(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))?;
        t.check_filter(filter)?;
        Ok(t.select(filter))
    }

    /// Execute a select with joins
    pub fn execute(&self, select: &Select) -> Result<Vec<Row>> {
        DatabaseStats::bump(&self.stats.selects);
        let tables = self.tables.read();
        let rows = execute_select(select, &tables)?;
        debug!(
            target: "valuta::storage",
            table = %select.from,
            joins = select.joins.len(),
            rows = rows.len(),
            "Select executed"
        );
        Ok(rows)
    }

    /// Number of rows in a table
    pub fn count(&self, table: &str) -> Result<usize> {
        let tables = self.tables.read();
        tables
            .get(table)
            .map(Table::len)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))
    }

    /// Round-trip counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
