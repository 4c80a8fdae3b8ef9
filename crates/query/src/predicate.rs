//! Predicate trees over keyed attributes
//!
//! A predicate is a closed sum type: `Equals`, `And`, `Or`, `Not` over
//! attribute references and literals. Each attribute reference carries its
//! own key, so one predicate can mix attributes evaluated at different keys.
//!
//! # Shape rules
//!
//! - `Equals` operands must be leaves (`Attribute` or `Literal`)
//! - `And`, `Or` and `Not` children must be boolean nodes, never leaves
//!
//! Anything else is rejected with `Error::UnsupportedPredicate`.

use std::fmt;
use std::sync::Arc;

use valuta_backends::{AttributeDescriptor, BackendDescriptor, HashFormat, KeyValueConfig, TableConfig};
use valuta_core::{Error, Key, Result, Value};

/// Where a referenced attribute is stored
#[derive(Debug, Clone, PartialEq)]
pub enum Origin {
    /// A column on the owner table
    Column,
    /// An entry in a hash column on the owner table
    HashValued {
        /// Hash column
        column: String,
        /// Storage format (literals are encoded the same way)
        format: HashFormat,
    },
    /// A shared key-value side table
    KeyValue(Arc<KeyValueConfig>),
    /// A dedicated price table
    Table(Arc<TableConfig>),
}

impl Origin {
    /// Identity used to group references onto one join inference pass
    ///
    /// Key-Value references group by association, Table references by
    /// table name. Owner-table origins need no join and have no identity.
    pub fn join_identity(&self) -> Option<String> {
        match self {
            Origin::KeyValue(config) => Some(format!("key_value:{}", config.association.name)),
            Origin::Table(config) => Some(format!("table:{}", config.table())),
            Origin::Column | Origin::HashValued { .. } => None,
        }
    }
}

/// A keyed attribute at one key
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRef {
    /// Attribute name
    pub attribute: String,
    /// Key the attribute is evaluated at
    pub key: Key,
    /// Owner type tag (used in Key-Value aliases and join conditions)
    pub owner_type: String,
    /// Storage origin
    pub origin: Origin,
}

impl AttributeRef {
    /// Reference to a declared attribute at `key`
    pub fn new(descriptor: &AttributeDescriptor, owner_type: &str, key: Key) -> Self {
        let origin = match &descriptor.backend {
            BackendDescriptor::Column { .. } => Origin::Column,
            BackendDescriptor::HashValued { column, format } => Origin::HashValued {
                column: column.clone(),
                format: *format,
            },
            BackendDescriptor::KeyValue(config) => Origin::KeyValue(config.clone()),
            BackendDescriptor::Table(config) => Origin::Table(config.clone()),
        };
        Self {
            attribute: descriptor.name.clone(),
            key,
            owner_type: owner_type.to_string(),
            origin,
        }
    }

    /// Join alias this reference reads through, if it needs a join
    pub fn alias(&self) -> Option<String> {
        match &self.origin {
            Origin::KeyValue(config) => {
                Some(config.alias(&self.owner_type, &self.attribute, &self.key))
            }
            Origin::Table(config) => Some(config.alias(&self.key)),
            Origin::Column | Origin::HashValued { .. } => None,
        }
    }
}

/// Predicate node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `left = right`; a NULL literal tests for absence
    Equals(Box<Node>, Box<Node>),
    /// Conjunction
    And(Box<Node>, Box<Node>),
    /// Disjunction
    Or(Box<Node>, Box<Node>),
    /// Negation
    Not(Box<Node>),
    /// Keyed attribute reference
    Attribute(AttributeRef),
    /// Constant
    Literal(Value),
}

impl Node {
    /// `attribute = value`
    pub fn equals(attribute: AttributeRef, value: impl Into<Value>) -> Node {
        Node::Equals(
            Box::new(Node::Attribute(attribute)),
            Box::new(Node::Literal(value.into())),
        )
    }

    /// `left = right` over two attributes
    pub fn same(left: AttributeRef, right: AttributeRef) -> Node {
        Node::Equals(
            Box::new(Node::Attribute(left)),
            Box::new(Node::Attribute(right)),
        )
    }

    /// `self AND other`
    pub fn and(self, other: Node) -> Node {
        Node::And(Box::new(self), Box::new(other))
    }

    /// `self OR other`
    pub fn or(self, other: Node) -> Node {
        Node::Or(Box::new(self), Box::new(other))
    }

    /// `NOT self`
    pub fn negate(self) -> Node {
        Node::Not(Box::new(self))
    }

    /// Left-folded conjunction; `None` for no nodes
    pub fn all<I: IntoIterator<Item = Node>>(nodes: I) -> Option<Node> {
        nodes.into_iter().reduce(Node::and)
    }

    /// Whether this node is an `Attribute` or `Literal`
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Attribute(_) | Node::Literal(_))
    }

    /// Whether this node is a NULL literal
    pub fn is_null_literal(&self) -> bool {
        matches!(self, Node::Literal(Value::Null))
    }

    /// Every attribute reference, in tree order
    pub fn attributes(&self) -> Vec<&AttributeRef> {
        let mut out = Vec::new();
        self.collect_attributes(&mut out);
        out
    }

    fn collect_attributes<'a>(&'a self, out: &mut Vec<&'a AttributeRef>) {
        match self {
            Node::Equals(l, r) | Node::And(l, r) | Node::Or(l, r) => {
                l.collect_attributes(out);
                r.collect_attributes(out);
            }
            Node::Not(x) => x.collect_attributes(out),
            Node::Attribute(a) => out.push(a),
            Node::Literal(_) => {}
        }
    }

    /// Check the shape rules for the whole tree
    pub fn validate(&self) -> Result<()> {
        match self {
            Node::Equals(l, r) => {
                for operand in [l, r] {
                    if !operand.is_leaf() {
                        return Err(unsupported("Equals operand must be an attribute or literal", operand));
                    }
                }
                Ok(())
            }
            Node::And(l, r) | Node::Or(l, r) => {
                l.validate()?;
                r.validate()
            }
            Node::Not(x) => x.validate(),
            Node::Attribute(_) | Node::Literal(_) => {
                Err(unsupported("leaf in boolean position", self))
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Equals(l, r) => write!(f, "({} = {})", l, r),
            Node::And(l, r) => write!(f, "({} AND {})", l, r),
            Node::Or(l, r) => write!(f, "({} OR {})", l, r),
            Node::Not(x) => write!(f, "NOT {}", x),
            Node::Attribute(a) => write!(f, "{}[{}]", a.attribute, a.key),
            Node::Literal(Value::Null) => f.write_str("NULL"),
            Node::Literal(v) => write!(f, "{:?}", v.to_string()),
        }
    }
}

pub(crate) fn unsupported(what: &str, node: &Node) -> Error {
    Error::UnsupportedPredicate(format!("{}: {}", what, node))
}
