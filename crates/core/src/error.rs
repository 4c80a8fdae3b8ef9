//! Error types for Valuta
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Every variant is a programmer or configuration error surfaced
//! synchronously. Nothing is retried.

use thiserror::Error;

use crate::key::KeyError;
use crate::types::RowId;

/// Result type alias for Valuta operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Valuta
#[derive(Debug, Error)]
pub enum Error {
    /// Key failed normalization or is not in the allowed set
    #[error("Invalid key {key:?}: {reason}")]
    InvalidKey {
        /// Raw key as supplied by the caller
        key: String,
        /// Why it was rejected
        reason: KeyError,
    },

    /// A required backend option is missing and cannot be defaulted
    #[error("Backend misconfigured for attribute '{attribute}': {reason}")]
    BackendMisconfigured {
        /// Attribute being declared
        attribute: String,
        /// Which option is missing or invalid
        reason: String,
    },

    /// A strategy that depends on the cache layer was declared without it
    #[error("Cache required for {strategy} backend (attribute '{attribute}')")]
    CacheRequired {
        /// Attribute being declared
        attribute: String,
        /// Strategy name
        strategy: &'static str,
    },

    /// Predicate tree shape with no join-inference rule
    #[error("Unsupported predicate: {0}")]
    UnsupportedPredicate(String),

    /// Attribute name not declared on the model
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    /// Table does not exist in storage
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// Column does not exist on a table
    #[error("Unknown column '{column}' on table '{table}'")]
    UnknownColumn {
        /// Table name
        table: String,
        /// Column name
        column: String,
    },

    /// Row lookup by id failed
    #[error("Row {id} not found in table '{table}'")]
    RowNotFound {
        /// Table name
        table: String,
        /// Row id
        id: RowId,
    },

    /// Value cannot be stored in a column of the expected type
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected value type
        expected: &'static str,
        /// Actual value type
        actual: &'static str,
    },

    /// Two joins in one query share an alias
    #[error("Ambiguous join alias: {0}")]
    AmbiguousAlias(String),

    /// Invalid operation or state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build an `InvalidKey` error
    pub fn invalid_key(key: impl Into<String>, reason: KeyError) -> Self {
        Error::InvalidKey {
            key: key.into(),
            reason,
        }
    }

    /// Build a `BackendMisconfigured` error
    pub fn misconfigured(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::BackendMisconfigured {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    /// Build an `UnknownColumn` error
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Error::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }
}
