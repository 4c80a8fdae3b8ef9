//! Core identifiers and small shared enums
//!
//! - `RowId`: primary key of a stored row
//! - `OwnerRef`: id + type tag addressing an owner in shared side tables
//! - `JoinType`: INNER / OUTER join requirement produced by join inference
//! - `ValueType`: column type of a shared key-value table
//! - `AccessOptions`: per-call backend options
//! - `LifecycleEvent`: owner lifecycle notifications

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::Value;

/// Primary key of a stored row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(u64);

impl RowId {
    /// Wrap a raw id
    pub fn new(id: u64) -> Self {
        RowId(id)
    }

    /// Raw id
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RowId> for Value {
    fn from(id: RowId) -> Self {
        Value::Int(id.0 as i64)
    }
}

/// Addresses a persisted owner in polymorphic side tables
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerRef {
    /// Owner row id
    pub id: RowId,
    /// Owner type tag (model name)
    pub type_name: String,
}

impl OwnerRef {
    /// Create a new owner reference
    pub fn new(id: RowId, type_name: impl Into<String>) -> Self {
        Self {
            id,
            type_name: type_name.into(),
        }
    }
}

/// Join requirement for a side table
///
/// `Inner` is the stronger requirement: it excludes owners with no
/// matching side row. `Outer` keeps them with NULL-extended columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    /// INNER JOIN
    Inner,
    /// LEFT OUTER JOIN
    Outer,
}

impl JoinType {
    /// Combine two requirements under AND: INNER dominates
    pub fn and(self, other: JoinType) -> JoinType {
        if self == JoinType::Inner || other == JoinType::Inner {
            JoinType::Inner
        } else {
            JoinType::Outer
        }
    }

    /// Whether a join of type `self` already satisfies a request for `wanted`
    pub fn satisfies(self, wanted: JoinType) -> bool {
        self == JoinType::Inner || wanted == JoinType::Outer
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => f.write_str("INNER JOIN"),
            JoinType::Outer => f.write_str("LEFT OUTER JOIN"),
        }
    }
}

/// Value type of a shared key-value price table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Integer amounts (e.g. minor units)
    Integer,
    /// Floating-point amounts
    Float,
    /// Free text
    Text,
}

impl ValueType {
    /// Lowercase name used in default table and association names
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Text => "text",
        }
    }

    /// Coerce a value into this type
    ///
    /// Blank input becomes `Null`. Text is parsed for numeric types.
    /// Anything else that does not fit is a `TypeMismatch`.
    pub fn coerce(&self, value: Value) -> Result<Value> {
        if value.is_blank() {
            return Ok(Value::Null);
        }
        let actual = value.type_name();
        let mismatch = || Error::TypeMismatch {
            expected: self.as_str(),
            actual,
        };
        match (self, value) {
            (ValueType::Integer, Value::Int(i)) => Ok(Value::Int(i)),
            (ValueType::Integer, Value::Float(x)) if is_integral(x) => Ok(Value::Int(x as i64)),
            (ValueType::Integer, Value::Text(s)) => {
                s.trim().parse::<i64>().map(Value::Int).map_err(|_| mismatch())
            }
            (ValueType::Float, Value::Float(x)) => Ok(Value::Float(x)),
            (ValueType::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
            (ValueType::Float, Value::Text(s)) => {
                s.trim().parse::<f64>().map(Value::Float).map_err(|_| mismatch())
            }
            (ValueType::Text, Value::Text(s)) => Ok(Value::Text(s)),
            (ValueType::Text, Value::Int(i)) => Ok(Value::Text(i.to_string())),
            (ValueType::Text, Value::Float(x)) => Ok(Value::Text(x.to_string())),
            (ValueType::Text, Value::Bool(b)) => Ok(Value::Text(b.to_string())),
            _ => Err(mismatch()),
        }
    }
}

/// Whole and within `i64` range, so `as i64` neither truncates nor saturates
fn is_integral(x: f64) -> bool {
    x.fract() == 0.0 && x >= i64::MIN as f64 && x < i64::MAX as f64
}

/// Per-call backend options
///
/// Passed by shared reference: a decorator that honours an option never
/// mutates the caller's copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessOptions {
    /// Skip the cache layer for this call (both read and write)
    pub bypass_cache: bool,
}

impl AccessOptions {
    /// Options that bypass the cache
    pub fn uncached() -> Self {
        Self { bypass_cache: true }
    }
}

/// Owner lifecycle notification from the host framework
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Owner was saved
    Save,
    /// Owner was reloaded from storage
    Reload,
    /// Owner was destroyed
    Destroy,
}
