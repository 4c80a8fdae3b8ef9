//! Join inference
//!
//! Decides, from a predicate tree, whether each side-table join must be
//! INNER or may need to be LEFT OUTER. INNER is preferred because it lets
//! the store drop non-matching owners early; OUTER is required whenever a
//! row with no Price record could still satisfy the predicate.
//!
//! # Tie-break rules
//!
//! - INNER dominates under `And`
//! - OUTER dominates under `Or`
//! - `Not` keeps the child's requirements unchanged
//!
//! The Key-Value visitor decides per attribute (every attribute has its own
//! join). The Table visitor decides once per price table, because a single
//! joined row serves every attribute column on it: an `Or` of two non-NULL
//! tests on the same table keeps the join INNER.

use std::collections::BTreeMap;

use valuta_backends::{KeyValueConfig, TableConfig};
use valuta_core::{JoinType, Key, Result};

use crate::predicate::{unsupported, AttributeRef, Node, Origin};

/// Per-attribute join requirements for one association at one key
pub type JoinMap = BTreeMap<String, JoinType>;

fn equality_join(l: &Node, r: &Node) -> JoinType {
    if l.is_null_literal() || r.is_null_literal() {
        JoinType::Outer
    } else {
        JoinType::Inner
    }
}

fn operands<'a>(l: &'a Node, r: &'a Node) -> Result<[&'a Node; 2]> {
    for operand in [l, r] {
        if !operand.is_leaf() {
            return Err(unsupported("Equals operand must be an attribute or literal", operand));
        }
    }
    Ok([l, r])
}

/// Key-Value join inference for one association at one key
#[derive(Debug, Clone, Copy)]
pub struct KeyValueVisitor<'a> {
    association: &'a str,
    key: &'a Key,
}

impl<'a> KeyValueVisitor<'a> {
    /// Visitor for references to `config` at `key`
    pub fn new(config: &'a KeyValueConfig, key: &'a Key) -> Self {
        Self {
            association: &config.association.name,
            key,
        }
    }

    /// Join type per referenced attribute
    pub fn accept(&self, node: &Node) -> Result<JoinMap> {
        match node {
            Node::Equals(l, r) => {
                let join = equality_join(l, r);
                let mut out = JoinMap::new();
                for operand in operands(l, r)? {
                    if let Node::Attribute(a) = operand {
                        if self.matches(a) {
                            out.insert(a.attribute.clone(), join);
                        }
                    }
                }
                Ok(out)
            }
            Node::And(l, r) => {
                let mut out = self.accept(l)?;
                for (attribute, join) in self.accept(r)? {
                    out.entry(attribute)
                        .and_modify(|existing| *existing = existing.and(join))
                        .or_insert(join);
                }
                Ok(out)
            }
            Node::Or(l, r) => {
                let mut out = self.accept(l)?;
                out.extend(self.accept(r)?);
                for join in out.values_mut() {
                    *join = JoinType::Outer;
                }
                Ok(out)
            }
            Node::Not(x) => self.accept(x),
            Node::Attribute(_) | Node::Literal(_) => {
                Err(unsupported("leaf in boolean position", node))
            }
        }
    }

    fn matches(&self, attribute: &AttributeRef) -> bool {
        match &attribute.origin {
            Origin::KeyValue(config) => {
                config.association.name == self.association && attribute.key == *self.key
            }
            _ => false,
        }
    }
}

/// Table join inference for one price table at one key
#[derive(Debug, Clone, Copy)]
pub struct TableVisitor<'a> {
    table: &'a str,
    key: &'a Key,
}

impl<'a> TableVisitor<'a> {
    /// Visitor for references to `config` at `key`
    pub fn new(config: &'a TableConfig, key: &'a Key) -> Self {
        Self {
            table: config.table(),
            key,
        }
    }

    /// Join type for the table, `None` when the tree never references it
    pub fn accept(&self, node: &Node) -> Result<Option<JoinType>> {
        match node {
            Node::Equals(l, r) => {
                let join = equality_join(l, r);
                let referenced = operands(l, r)?
                    .iter()
                    .any(|n| matches!(n, Node::Attribute(a) if self.matches(a)));
                Ok(referenced.then_some(join))
            }
            Node::And(l, r) => {
                let left = self.accept(l)?;
                let right = self.accept(r)?;
                Ok(match (left, right) {
                    (Some(JoinType::Inner), _) | (_, Some(JoinType::Inner)) => Some(JoinType::Inner),
                    (left, right) => left.or(right),
                })
            }
            Node::Or(l, r) => {
                let left = self.accept(l)?;
                let right = self.accept(r)?;
                Ok(match (left, right) {
                    (Some(JoinType::Inner), Some(JoinType::Inner)) => Some(JoinType::Inner),
                    (None, None) => None,
                    _ => Some(JoinType::Outer),
                })
            }
            Node::Not(x) => self.accept(x),
            Node::Attribute(_) | Node::Literal(_) => {
                Err(unsupported("leaf in boolean position", node))
            }
        }
    }

    fn matches(&self, attribute: &AttributeRef) -> bool {
        match &attribute.origin {
            Origin::Table(config) => config.table() == self.table && attribute.key == *self.key,
            _ => false,
        }
    }
}
