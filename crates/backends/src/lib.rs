//! Storage backends for keyed attributes
//!
//! This crate implements the per-attribute storage strategies:
//! - Column: one owner column per key (`price_usd`)
//! - HashValued: one JSON / hstore map column per attribute
//! - KeyValue: shared polymorphic side tables, one per value type
//! - Table: a dedicated price table per model, one column per attribute
//! - CachingBackend: per-owner memoization over any of the above
//!
//! Backends operate on an [`OwnerState`], which owns the owner row values
//! and the lazily loaded Price-record associations. Declaration options are
//! resolved into [`AttributeDescriptor`]s by [`configure`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod cache;
pub mod column;
pub mod descriptor;
pub mod hash_valued;
pub mod key_value;
pub mod naming;
pub mod owner;
pub mod table;

pub use backend::Backend;
pub use cache::CachingBackend;
pub use column::ColumnBackend;
pub use descriptor::{
    configure, AttributeDescriptor, BackendDescriptor, BackendOptions, DeclarationDefaults,
    ModelInfo, Strategy,
};
pub use hash_valued::{HashFormat, HashValuedBackend};
pub use key_value::{KeyValueBackend, KeyValueConfig};
pub use owner::{Association, AssociationSpec, OwnerState, PriceRecord};
pub use table::{TableBackend, TableConfig};
