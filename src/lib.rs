//! Valuta - currency-keyed model attributes over pluggable storage
//!
//! A keyed attribute holds one value per key (a currency code) on each
//! owner. Where those values live is chosen per attribute:
//! - Column: one owner column per key
//! - Json / Hstore: one map column per attribute
//! - KeyValue: shared side tables keyed by owner, attribute and key
//! - Table: a per-model price table with one column per attribute
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use valuta::{BackendOptions, Database, Key, ModelBuilder, ValueType};
//!
//! let db = Arc::new(Database::new());
//! let products = ModelBuilder::new("Product", "products")
//!     .attribute("price", BackendOptions::key_value(ValueType::Integer))
//!     .build(db)?;
//!
//! let usd = Key::new("usd")?;
//! let mut product = products.new_record()?;
//! product.set("price", &usd, 1200)?;
//! product.save()?;
//!
//! let cheap = products.find_by(&[("price", 1200.into())], &usd)?;
//! ```
//!
//! # Architecture
//!
//! Declarations are resolved by `valuta-backends` into descriptors; each
//! [`Record`] instantiates one backend per attribute, wrapped in the cache
//! layer unless disabled. Queries go through `valuta-query`, which infers
//! INNER or OUTER joins for side tables from the predicate shape.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accessor;
pub mod config;
pub mod context;
pub mod model;
pub mod record;

pub use accessor::Accessor;
pub use config::{Configuration, CONFIG_FILE_NAME};
pub use context::PriceContext;
pub use model::{Model, ModelBuilder};
pub use record::Record;

pub use valuta_backends::{
    AttributeDescriptor, Backend, BackendOptions, DeclarationDefaults, HashFormat, Strategy,
};
pub use valuta_core::{
    AccessOptions, Error, JoinType, Key, KeySet, LifecycleEvent, Result, RowId, Value, ValueType,
};
pub use valuta_query::{AttributeRef, Node, QueryBuilder};
pub use valuta_storage::{ColumnType, Database, StatsSnapshot, TableSchema};
