//! Storage layer for Valuta
//!
//! This crate is the host storage engine keyed-attribute backends persist
//! into. It implements:
//! - Database: named in-memory tables behind `parking_lot::RwLock`
//! - TableSchema / SchemaRequirement: what backends ask the host to create
//! - Select: joins (INNER / LEFT OUTER) and three-valued filter evaluation
//! - DatabaseStats: round-trip counters for tests

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod database;
pub mod schema;
pub mod select;
pub mod table;

pub use database::{Database, DatabaseStats, StatsSnapshot};
pub use schema::{ColumnDef, ColumnType, SchemaRequirement, TableSchema, ID_COLUMN};
pub use select::{ColumnRef, Expr, Join, JoinOn, JoinValue, Operand, Relation, Select, Truth};
pub use table::{Filter, Row, Table};
