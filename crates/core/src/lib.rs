//! Core types for Valuta
//!
//! This crate defines the foundational types used throughout the system:
//! - Key: Normalized currency key, and KeySet (the allowed keys)
//! - Value: Unified value enum for keyed attribute values and row cells
//! - RowId / OwnerRef: Row and owner addressing
//! - JoinType: INNER / OUTER requirement produced by join inference
//! - AccessOptions / LifecycleEvent: Backend call options and owner events
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod key;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use key::{Key, KeyError, KeySet, DEFAULT_AVAILABLE_KEYS, MAX_KEY_BYTES};
pub use types::{AccessOptions, JoinType, LifecycleEvent, OwnerRef, RowId, ValueType};
pub use value::Value;
