//! Querying keyed attributes
//!
//! This crate turns predicates over keyed attributes into selects against
//! the owner table:
//! - Node: the predicate sum type (`Equals` / `And` / `Or` / `Not`)
//! - KeyValueVisitor / TableVisitor: INNER vs OUTER join inference
//! - QueryBuilder: join application (reuse, upgrade, never duplicate)
//!   and predicate compilation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod predicate;
pub mod visitor;

pub use builder::{compile, QueryBuilder};
pub use predicate::{AttributeRef, Node, Origin};
pub use visitor::{JoinMap, KeyValueVisitor, TableVisitor};
