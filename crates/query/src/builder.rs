//! Query builder: predicates to selects with inferred joins
//!
//! [`QueryBuilder::filter`] takes a predicate tree, runs join inference for
//! every side table it references, adds the resulting joins and ANDs the
//! compiled predicate onto the query. Calling `filter` again composes; joins
//! already present are reused or upgraded, never duplicated.

use std::collections::BTreeMap;

use tracing::debug;

use valuta_backends::column::column_name;
use valuta_backends::key_value::{
    ATTRIBUTE_COLUMN, KEY_COLUMN as KV_KEY_COLUMN, OWNER_ID_COLUMN, OWNER_TYPE_COLUMN, VALUE_COLUMN,
};
use valuta_backends::table::KEY_COLUMN as TABLE_KEY_COLUMN;
use valuta_core::{Error, JoinType, Key, Result, Value};
use valuta_storage::{ColumnRef, Database, Expr, Join, JoinOn, Operand, Row, Select, ID_COLUMN};

use crate::predicate::{unsupported, AttributeRef, Node, Origin};
use crate::visitor::{KeyValueVisitor, TableVisitor};

/// A select over one owner table, built up from predicates
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    from: String,
    joins: Vec<Join>,
    filter: Option<Expr>,
}

impl QueryBuilder {
    /// Query over every row of `table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            from: table.into(),
            joins: Vec::new(),
            filter: None,
        }
    }

    /// Base table
    pub fn table(&self) -> &str {
        &self.from
    }

    /// Joins added so far, in order
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Join at `alias`, if any
    pub fn join(&self, alias: &str) -> Option<&Join> {
        self.joins.iter().find(|j| j.alias == alias)
    }

    /// AND `node` onto the query, inferring the joins it needs
    pub fn filter(mut self, node: Node) -> Result<Self> {
        node.validate()?;
        let compiled = compile(&node)?;

        let mut groups: BTreeMap<(String, Key), &AttributeRef> = BTreeMap::new();
        for attribute in node.attributes() {
            if let Some(identity) = attribute.origin.join_identity() {
                groups.entry((identity, attribute.key.clone())).or_insert(attribute);
            }
        }

        for ((_, key), reference) in groups {
            match &reference.origin {
                Origin::KeyValue(config) => {
                    let joins = KeyValueVisitor::new(config, &key).accept(&node)?;
                    for (attribute, kind) in joins {
                        let alias = config.alias(&reference.owner_type, &attribute, &key);
                        self.add_join(Join {
                            kind,
                            table: config.table().to_string(),
                            alias,
                            on: vec![
                                JoinOn::base(OWNER_ID_COLUMN, ID_COLUMN),
                                JoinOn::literal(OWNER_TYPE_COLUMN, reference.owner_type.as_str()),
                                JoinOn::literal(ATTRIBUTE_COLUMN, attribute.as_str()),
                                JoinOn::literal(KV_KEY_COLUMN, key.as_str()),
                            ],
                        })?;
                    }
                }
                Origin::Table(config) => {
                    if let Some(kind) = TableVisitor::new(config, &key).accept(&node)? {
                        self.add_join(Join {
                            kind,
                            table: config.table().to_string(),
                            alias: config.alias(&key),
                            on: vec![
                                JoinOn::base(config.association.foreign_key.as_str(), ID_COLUMN),
                                JoinOn::literal(TABLE_KEY_COLUMN, key.as_str()),
                            ],
                        })?;
                    }
                }
                Origin::Column | Origin::HashValued { .. } => {}
            }
        }

        self.filter = Some(match self.filter.take() {
            Some(existing) => Expr::And(Box::new(existing), Box::new(compiled)),
            None => compiled,
        });
        Ok(self)
    }

    /// Add a join, reusing or upgrading one already at the same alias
    ///
    /// An existing join is reused when it is INNER or the request is OUTER.
    /// An existing OUTER join is upgraded in place when INNER is requested.
    /// Joins are never downgraded.
    pub fn add_join(&mut self, join: Join) -> Result<()> {
        let Some(index) = self.joins.iter().position(|j| j.alias == join.alias) else {
            debug!(target: "valuta::query", alias = %join.alias, kind = %join.kind, "Join added");
            self.joins.push(join);
            return Ok(());
        };

        let existing = &mut self.joins[index];
        if existing.table != join.table || existing.on != join.on {
            return Err(Error::AmbiguousAlias(join.alias));
        }
        if existing.kind.satisfies(join.kind) {
            debug!(target: "valuta::query", alias = %join.alias, kind = %existing.kind, "Join reused");
        } else {
            debug!(target: "valuta::query", alias = %join.alias, "Join upgraded to INNER");
            existing.kind = JoinType::Inner;
        }
        Ok(())
    }

    /// Force every join to LEFT OUTER
    ///
    /// Outer joins never drop a row the filter could accept, so this gives
    /// the reference result for a query when checking inferred joins.
    pub fn all_outer(mut self) -> Self {
        for join in &mut self.joins {
            join.kind = JoinType::Outer;
        }
        self
    }

    /// The select this builder describes
    pub fn to_select(&self) -> Select {
        Select {
            from: self.from.clone(),
            joins: self.joins.clone(),
            filter: self.filter.clone(),
        }
    }

    /// Run the query, returning distinct owner rows in id order
    pub fn execute(&self, db: &Database) -> Result<Vec<Row>> {
        let select = self.to_select();
        let rows = db.execute(&select)?;
        debug!(
            target: "valuta::query",
            table = %self.from,
            joins = self.joins.len(),
            rows = rows.len(),
            "Query executed"
        );
        Ok(rows)
    }
}

/// Compile a predicate tree into a storage filter expression
pub fn compile(node: &Node) -> Result<Expr> {
    match node {
        Node::Equals(l, r) => match (l.as_ref(), r.as_ref()) {
            (Node::Attribute(a), Node::Literal(Value::Null))
            | (Node::Literal(Value::Null), Node::Attribute(a)) => {
                Ok(Expr::IsNull(Operand::Column(column_ref(a))))
            }
            (l, r) => Ok(Expr::Eq(operand(l, r)?, operand(r, l)?)),
        },
        Node::And(l, r) => Ok(Expr::And(Box::new(compile(l)?), Box::new(compile(r)?))),
        Node::Or(l, r) => Ok(Expr::Or(Box::new(compile(l)?), Box::new(compile(r)?))),
        Node::Not(x) => Ok(Expr::Not(Box::new(compile(x)?))),
        Node::Attribute(_) | Node::Literal(_) => Err(unsupported("leaf in boolean position", node)),
    }
}

/// Compile one `Equals` operand; `other` is the opposite side
fn operand(node: &Node, other: &Node) -> Result<Operand> {
    match node {
        Node::Attribute(a) => Ok(Operand::Column(column_ref(a))),
        Node::Literal(v) => Ok(Operand::Literal(encode_literal(v, other)?)),
        _ => Err(unsupported("Equals operand must be an attribute or literal", node)),
    }
}

/// Literals compared against an hstore entry are stored as text
fn encode_literal(value: &Value, other: &Node) -> Result<Value> {
    match other {
        Node::Attribute(AttributeRef {
            origin: Origin::HashValued { format, .. },
            ..
        }) => format.encode(value.clone()),
        _ => Ok(value.clone()),
    }
}

fn column_ref(attribute: &AttributeRef) -> ColumnRef {
    match &attribute.origin {
        Origin::Column => ColumnRef::base(column_name(&attribute.attribute, &attribute.key)),
        Origin::HashValued { column, .. } => {
            ColumnRef::base(column.as_str()).with_path(attribute.key.as_str())
        }
        Origin::KeyValue(config) => ColumnRef::aliased(
            config.alias(&attribute.owner_type, &attribute.attribute, &attribute.key),
            VALUE_COLUMN,
        ),
        Origin::Table(config) => {
            ColumnRef::aliased(config.alias(&attribute.key), attribute.attribute.as_str())
        }
    }
}
