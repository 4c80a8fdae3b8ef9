//! Model declaration
//!
//! A [`ModelBuilder`] collects the owner table, its plain columns and the
//! keyed attribute declarations, resolves the declarations into backend
//! descriptors and asks the database to materialize what they need. The
//! resulting [`Model`] is immutable: attribute declarations are consumed
//! once at setup.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use valuta_backends::{
    configure, AssociationSpec, AttributeDescriptor, BackendOptions, DeclarationDefaults,
    ModelInfo,
};
use valuta_core::{Error, Key, KeySet, Result, RowId, Value};
use valuta_query::{AttributeRef, Node, QueryBuilder};
use valuta_storage::{ColumnDef, ColumnType, Database, Row, SchemaRequirement, TableSchema};

use crate::config::Configuration;
use crate::record::Record;

/// Declares a model and its keyed attributes
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    info: ModelInfo,
    columns: Vec<ColumnDef>,
    declarations: Vec<(String, BackendOptions)>,
    defaults: DeclarationDefaults,
    migrate: bool,
}

impl ModelBuilder {
    /// Start declaring `type_name`, stored in `table`
    pub fn new(type_name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            info: ModelInfo::new(type_name, table),
            columns: Vec::new(),
            declarations: Vec::new(),
            defaults: DeclarationDefaults::default(),
            migrate: true,
        }
    }

    /// Use explicit declaration defaults
    pub fn defaults(mut self, defaults: DeclarationDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Take declaration defaults from a configuration
    pub fn configuration(self, config: &Configuration) -> Result<Self> {
        Ok(self.defaults(config.declaration_defaults()?))
    }

    /// A plain (non-keyed) owner column
    pub fn column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.push(ColumnDef::new(name, ty));
        self
    }

    /// A keyed attribute
    pub fn attribute(mut self, name: impl Into<String>, options: BackendOptions) -> Self {
        self.declarations.push((name.into(), options));
        self
    }

    /// Whether `build` materializes schema requirements (default `true`)
    ///
    /// With `false` the host owns the schema: the owner table must already
    /// exist and missing Column-strategy columns stay missing.
    pub fn migrate(mut self, migrate: bool) -> Self {
        self.migrate = migrate;
        self
    }

    /// Resolve declarations and materialize their storage
    pub fn build(self, db: Arc<Database>) -> Result<Model> {
        let attributes = configure(&self.info, &self.declarations, &self.defaults)?;

        if self.migrate {
            let mut owner = TableSchema::new(self.info.table.clone());
            owner.columns = self.columns;
            db.apply(&SchemaRequirement::Table(owner))?;
            for attribute in &attributes {
                db.apply_all(&attribute.requirements(&self.info))?;
            }
        } else if !db.has_table(&self.info.table) {
            return Err(Error::UnknownTable(self.info.table.clone()));
        }

        let mut associations = BTreeMap::new();
        for attribute in &attributes {
            if let Some(spec) = attribute.association() {
                associations
                    .entry(spec.name.clone())
                    .or_insert_with(|| spec.clone());
            }
        }

        info!(
            target: "valuta::model",
            model = %self.info.type_name,
            table = %self.info.table,
            attributes = attributes.len(),
            associations = associations.len(),
            "Model declared"
        );

        Ok(Model {
            inner: Arc::new(ModelInner {
                db,
                info: self.info,
                keys: self.defaults.keys,
                attributes,
                associations,
            }),
        })
    }
}

struct ModelInner {
    db: Arc<Database>,
    info: ModelInfo,
    keys: Arc<KeySet>,
    attributes: Vec<AttributeDescriptor>,
    associations: BTreeMap<String, AssociationSpec>,
}

/// A declared model
///
/// Cheap to clone; every record keeps a handle to its model.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl Model {
    // ========== Declaration ==========

    /// Database handle
    pub fn db(&self) -> &Arc<Database> {
        &self.inner.db
    }

    /// Owner type tag
    pub fn type_name(&self) -> &str {
        &self.inner.info.type_name
    }

    /// Owner table
    pub fn table(&self) -> &str {
        &self.inner.info.table
    }

    /// Available keys
    pub fn keys(&self) -> &KeySet {
        &self.inner.keys
    }

    /// Declared attributes, in declaration order
    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.inner.attributes
    }

    /// Descriptor for `name`
    pub fn attribute(&self, name: &str) -> Result<&AttributeDescriptor> {
        self.inner
            .attributes
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| Error::UnknownAttribute(name.to_string()))
    }

    /// Side-table associations used by this model, by name
    pub fn associations(&self) -> &BTreeMap<String, AssociationSpec> {
        &self.inner.associations
    }

    // ========== Querying ==========

    /// Reference to attribute `name` evaluated at `key`
    pub fn attr(&self, name: &str, key: &Key) -> Result<AttributeRef> {
        self.inner.keys.ensure(key)?;
        let descriptor = self.attribute(name)?;
        Ok(AttributeRef::new(descriptor, self.type_name(), key.clone()))
    }

    /// An unfiltered query over the owner table
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new(self.table())
    }

    /// A query filtered by `node`
    pub fn filter(&self, node: Node) -> Result<QueryBuilder> {
        self.query().filter(node)
    }

    /// Run `query` and hydrate the matching owners
    pub fn load(&self, query: &QueryBuilder) -> Result<Vec<Record>> {
        let rows = query.execute(&self.inner.db)?;
        debug!(
            target: "valuta::model",
            model = %self.type_name(),
            joins = query.joins().len(),
            rows = rows.len(),
            "Records loaded"
        );
        self.hydrate(rows)
    }

    /// Owners whose attributes equal the given values at `key`
    ///
    /// Pairs are ANDed. A NULL value matches owners with no value at `key`.
    pub fn find_by(&self, conditions: &[(&str, Value)], key: &Key) -> Result<Vec<Record>> {
        let mut nodes = Vec::with_capacity(conditions.len());
        for (name, value) in conditions {
            nodes.push(Node::equals(self.attr(name, key)?, value.clone()));
        }
        match Node::all(nodes) {
            Some(node) => self.load(&self.filter(node)?),
            None => self.all(),
        }
    }

    /// Owner with id `id`
    pub fn find(&self, id: RowId) -> Result<Option<Record>> {
        match self.inner.db.get(self.table(), id)? {
            Some(row) => Ok(Some(Record::from_row(self, row)?)),
            None => Ok(None),
        }
    }

    /// Every owner, ascending id
    pub fn all(&self) -> Result<Vec<Record>> {
        self.load(&self.query())
    }

    /// A new, unsaved owner
    pub fn new_record(&self) -> Result<Record> {
        Record::new(self)
    }

    fn hydrate(&self, rows: Vec<Row>) -> Result<Vec<Record>> {
        rows.into_iter().map(|row| Record::from_row(self, row)).collect()
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("type_name", &self.type_name())
            .field("table", &self.table())
            .field(
                "attributes",
                &self.inner.attributes.iter().map(|a| &a.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
