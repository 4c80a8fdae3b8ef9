//! Owner state: the model instance as backends see it
//!
//! ## Design
//!
//! `OwnerState` holds everything a backend may touch on one owner:
//! - the owner row's column values (Column and Hash-Valued strategies)
//! - lazily loaded associations of Price records (Key-Value and Table)
//!
//! Backends receive `&mut OwnerState` on every call, so the backend
//! objects themselves stay free of references into the owner.
//!
//! ## Loading
//!
//! An association is loaded with exactly one `select_where` the first time
//! it is touched. A new owner has nothing to load and starts with an empty,
//! already-loaded association. Built records live only in memory until
//! [`OwnerState::save`] flushes them.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use valuta_core::{Error, OwnerRef, Result, RowId, Value};
use valuta_storage::{Database, Row};

static NULL: Value = Value::Null;

/// How an owner's Price records are addressed in a side table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationSpec {
    /// Association name, unique per owner model
    pub name: String,
    /// Side table
    pub table: String,
    /// Column holding the owner id
    pub foreign_key: String,
    /// Column holding the owner type (polymorphic shared tables only)
    pub owner_type_column: Option<String>,
}

impl AssociationSpec {
    /// Equality filter selecting one owner's records
    fn owner_filter(&self, owner: &OwnerRef) -> Vec<(&str, Value)> {
        let mut filter = vec![(self.foreign_key.as_str(), Value::from(owner.id))];
        if let Some(col) = &self.owner_type_column {
            filter.push((col.as_str(), Value::from(owner.type_name.as_str())));
        }
        filter
    }
}

/// An in-memory Price record
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    id: Option<RowId>,
    cells: BTreeMap<String, Value>,
    changed: BTreeSet<String>,
    marked_for_destruction: bool,
}

impl PriceRecord {
    fn built(cells: BTreeMap<String, Value>) -> Self {
        let changed = cells.keys().cloned().collect();
        Self {
            id: None,
            cells,
            changed,
            marked_for_destruction: false,
        }
    }

    fn loaded(row: Row) -> Self {
        Self {
            id: Some(row.id),
            cells: row.cells,
            changed: BTreeSet::new(),
            marked_for_destruction: false,
        }
    }

    /// Row id once persisted
    pub fn id(&self) -> Option<RowId> {
        self.id
    }

    /// Whether this record has never been saved
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Read a cell (NULL when unset)
    pub fn get(&self, column: &str) -> &Value {
        self.cells.get(column).unwrap_or(&NULL)
    }

    /// Whether a text cell equals `expected`
    pub fn text_eq(&self, column: &str, expected: &str) -> bool {
        self.get(column).as_text() == Some(expected)
    }

    /// Set a cell, tracking the change
    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        if self.cells.get(&column) != Some(&value) {
            self.changed.insert(column.clone());
            self.cells.insert(column, value);
        }
        self.marked_for_destruction = false;
    }

    /// Whether any cell changed since load
    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Schedule deletion on the next save
    pub fn mark_for_destruction(&mut self) {
        self.marked_for_destruction = true;
    }

    /// Whether deletion is scheduled
    pub fn is_marked_for_destruction(&self) -> bool {
        self.marked_for_destruction
    }
}

/// One owner's records in one side table, in insertion order
#[derive(Debug, Clone, Default)]
pub struct Association {
    records: Vec<PriceRecord>,
}

impl Association {
    /// Records in insertion order
    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    /// Mutable records
    pub fn records_mut(&mut self) -> &mut [PriceRecord] {
        &mut self.records
    }

    /// Index of the first record matching `pred`
    pub fn position(&self, pred: impl Fn(&PriceRecord) -> bool) -> Option<usize> {
        self.records.iter().position(pred)
    }

    /// Record at `index`
    pub fn get_mut(&mut self, index: usize) -> Option<&mut PriceRecord> {
        self.records.get_mut(index)
    }

    /// Build an unsaved record and return its index
    pub fn build(&mut self, cells: BTreeMap<String, Value>) -> usize {
        self.records.push(PriceRecord::built(cells));
        self.records.len() - 1
    }

    /// Find the record matching `pred`, building one from `cells` if none
    pub fn find_or_build(
        &mut self,
        pred: impl Fn(&PriceRecord) -> bool,
        cells: impl FnOnce() -> BTreeMap<String, Value>,
    ) -> &mut PriceRecord {
        let index = match self.position(pred) {
            Some(i) => i,
            None => self.build(cells()),
        };
        &mut self.records[index]
    }
}

/// The owner instance as seen by backends
#[derive(Debug)]
pub struct OwnerState {
    db: Arc<Database>,
    table: String,
    type_name: String,
    id: Option<RowId>,
    destroyed: bool,
    column_names: Vec<String>,
    columns: BTreeMap<String, Value>,
    changed_columns: BTreeSet<String>,
    associations: BTreeMap<String, Association>,
}

impl OwnerState {
    /// A new, unsaved owner stored in `table`
    pub fn new(db: Arc<Database>, table: &str, type_name: &str) -> Result<Self> {
        let column_names = db.column_names(table)?;
        Ok(Self {
            db,
            table: table.to_string(),
            type_name: type_name.to_string(),
            id: None,
            destroyed: false,
            column_names,
            columns: BTreeMap::new(),
            changed_columns: BTreeSet::new(),
            associations: BTreeMap::new(),
        })
    }

    /// An owner hydrated from a stored row
    pub fn from_row(db: Arc<Database>, table: &str, type_name: &str, row: Row) -> Result<Self> {
        let mut state = Self::new(db, table, type_name)?;
        state.id = Some(row.id);
        state.columns = row.cells;
        Ok(state)
    }

    // ========== Identity ==========

    /// Database handle
    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// Owner table
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Owner type tag
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Row id once persisted
    pub fn id(&self) -> Option<RowId> {
        self.id
    }

    /// Whether the owner row exists in storage
    pub fn is_persisted(&self) -> bool {
        self.id.is_some() && !self.destroyed
    }

    /// Whether `destroy` has run
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Id + type, once persisted
    pub fn owner_ref(&self) -> Option<OwnerRef> {
        self.id.map(|id| OwnerRef::new(id, self.type_name.clone()))
    }

    // ========== Columns ==========

    /// Column names of the owner table (schema snapshot at construction)
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Whether the owner table has `column`
    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// Read a column; `None` when the column does not exist
    pub fn read_column(&self, column: &str) -> Option<&Value> {
        if self.has_column(column) {
            Some(self.columns.get(column).unwrap_or(&NULL))
        } else {
            None
        }
    }

    /// Write a column in memory
    pub fn write_column(&mut self, column: &str, value: Value) -> Result<()> {
        if !self.has_column(column) {
            return Err(Error::unknown_column(&self.table, column));
        }
        self.columns.insert(column.to_string(), value);
        self.changed_columns.insert(column.to_string());
        Ok(())
    }

    // ========== Associations ==========

    /// Borrow an association, loading it on first use
    pub fn association(&mut self, spec: &AssociationSpec) -> Result<&mut Association> {
        let owner = self.owner_ref().filter(|_| !self.destroyed);
        match self.associations.entry(spec.name.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let association = match owner {
                    Some(owner) => {
                        let filter = spec.owner_filter(&owner);
                        let rows = self.db.select_where(&spec.table, &filter)?;
                        debug!(
                            target: "valuta::backend",
                            association = %spec.name,
                            owner_id = %owner.id,
                            records = rows.len(),
                            "Association loaded"
                        );
                        Association {
                            records: rows.into_iter().map(PriceRecord::loaded).collect(),
                        }
                    }
                    None => Association::default(),
                };
                Ok(entry.insert(association))
            }
        }
    }

    /// Borrow an association only if it has been loaded
    pub fn loaded_association(&mut self, name: &str) -> Option<&mut Association> {
        self.associations.get_mut(name)
    }

    /// Whether an association has been loaded
    pub fn is_loaded(&self, name: &str) -> bool {
        self.associations.contains_key(name)
    }

    // ========== Persistence ==========

    /// Persist the owner row and flush every loaded association
    ///
    /// `specs` maps association names to their addressing. Records marked
    /// for destruction are deleted (or dropped when never saved); new
    /// records are inserted with the owner foreign key; changed records
    /// are updated.
    pub fn save(&mut self, specs: &BTreeMap<String, AssociationSpec>) -> Result<()> {
        if self.destroyed {
            return Err(Error::InvalidOperation(
                "cannot save a destroyed owner".to_string(),
            ));
        }

        let id = match self.id {
            Some(id) => {
                if !self.changed_columns.is_empty() {
                    let cells = self
                        .changed_columns
                        .iter()
                        .map(|c| (c.clone(), self.columns.get(c).cloned().unwrap_or_default()))
                        .collect();
                    self.db.update(&self.table, id, cells)?;
                }
                id
            }
            None => {
                let id = self.db.insert(&self.table, self.columns.clone())?;
                self.id = Some(id);
                id
            }
        };
        self.changed_columns.clear();

        let owner = OwnerRef::new(id, self.type_name.clone());
        for (name, association) in self.associations.iter_mut() {
            let spec = specs.get(name).ok_or_else(|| {
                Error::InvalidOperation(format!("no addressing for association '{}'", name))
            })?;
            flush(&self.db, spec, &owner, association)?;
        }
        Ok(())
    }

    /// Re-read the owner row and forget loaded associations
    pub fn reload(&mut self) -> Result<()> {
        let id = match (self.id, self.destroyed) {
            (Some(id), false) => id,
            _ => {
                return Err(Error::InvalidOperation(
                    "cannot reload an owner that is not persisted".to_string(),
                ))
            }
        };
        let row = self.db.get(&self.table, id)?.ok_or_else(|| Error::RowNotFound {
            table: self.table.clone(),
            id,
        })?;
        self.columns = row.cells;
        self.changed_columns.clear();
        self.associations.clear();
        Ok(())
    }

    /// Delete the owner row and cascade to every given side table
    pub fn destroy<'a, I>(&mut self, cascades: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a AssociationSpec>,
    {
        if let Some(owner) = self.owner_ref().filter(|_| !self.destroyed) {
            self.db.delete(&self.table, owner.id)?;
            for spec in cascades {
                let removed = self.db.delete_where(&spec.table, &spec.owner_filter(&owner))?;
                debug!(
                    target: "valuta::backend",
                    table = %spec.table,
                    owner_id = %owner.id,
                    removed,
                    "Price records cascaded"
                );
            }
        }
        self.destroyed = true;
        self.associations.clear();
        Ok(())
    }
}

fn flush(
    db: &Database,
    spec: &AssociationSpec,
    owner: &OwnerRef,
    association: &mut Association,
) -> Result<()> {
    let mut kept = Vec::with_capacity(association.records.len());
    for mut record in association.records.drain(..) {
        match (record.id, record.marked_for_destruction) {
            (Some(id), true) => {
                db.delete(&spec.table, id)?;
            }
            (None, true) => {}
            (None, false) => {
                let mut cells = record.cells.clone();
                cells.insert(spec.foreign_key.clone(), Value::from(owner.id));
                if let Some(col) = &spec.owner_type_column {
                    cells.insert(col.clone(), Value::from(owner.type_name.as_str()));
                }
                record.id = Some(db.insert(&spec.table, cells)?);
                record.changed.clear();
                kept.push(record);
            }
            (Some(id), false) => {
                if record.is_changed() {
                    let cells = record
                        .changed
                        .iter()
                        .map(|c| (c.clone(), record.get(c).clone()))
                        .collect();
                    db.update(&spec.table, id, cells)?;
                    record.changed.clear();
                }
                kept.push(record);
            }
        }
    }
    association.records = kept;
    Ok(())
}
