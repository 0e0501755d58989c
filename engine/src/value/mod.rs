//! Record data model.
//!
//! ```text
//!            Value
//!      ┌───────┼────────┐
//!   String   Array     Hash
//!           [Value]  {field: Value}
//! ```
//!
//! A [`Value`] holds exactly one variant. Absence is expressed as
//! `Option<Value>::None`, so containers can never hold a null entry.
//!
//! - [`array`] - ordered sequence of values
//! - [`hash`] - ordered fields with wildcard lookup
//! - [`pattern`] - glob to regex translation and per-hash cache
//! - [`path`] - dotted path resolution (read, write, remove, transform)
//! - [`json`] - conversion from and to `serde_json`

pub mod array;
pub mod hash;
pub mod json;
pub mod path;
pub mod pattern;

pub use array::Array;
pub use hash::Hash;
pub use path::{FixPath, InsertMode};
pub use pattern::{FieldPattern, PatternCache};

use crate::error::{FixError, FixResult};

/// Name of a [`Value`] variant, used in type errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Array,
    Hash,
    String,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueKind::Array => "Array",
            ValueKind::Hash => "Hash",
            ValueKind::String => "String",
        };
        f.write_str(name)
    }
}

/// A node in a record tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Array(Array),
    Hash(Hash),
    String(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::String(String::new())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Array(_) => ValueKind::Array,
            Value::Hash(_) => ValueKind::Hash,
            Value::String(_) => ValueKind::String,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_hash(&self) -> bool {
        matches!(self, Value::Hash(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Empty string, array or hash.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Array(array) => array.is_empty(),
            Value::Hash(hash) => hash.is_empty(),
            Value::String(s) => s.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The string payload, or a type mismatch.
    pub fn as_string(&self) -> FixResult<&str> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(FixError::type_mismatch(ValueKind::String, other.kind())),
        }
    }

    pub fn as_array(&self) -> FixResult<&Array> {
        match self {
            Value::Array(array) => Ok(array),
            other => Err(FixError::type_mismatch(ValueKind::Array, other.kind())),
        }
    }

    pub fn as_hash(&self) -> FixResult<&Hash> {
        match self {
            Value::Hash(hash) => Ok(hash),
            other => Err(FixError::type_mismatch(ValueKind::Hash, other.kind())),
        }
    }

    pub fn as_array_mut(&mut self) -> FixResult<&mut Array> {
        match self {
            Value::Array(array) => Ok(array),
            other => Err(FixError::type_mismatch(ValueKind::Array, other.kind())),
        }
    }

    pub fn as_hash_mut(&mut self) -> FixResult<&mut Hash> {
        match self {
            Value::Hash(hash) => Ok(hash),
            other => Err(FixError::type_mismatch(ValueKind::Hash, other.kind())),
        }
    }

    pub fn into_hash(self) -> FixResult<Hash> {
        match self {
            Value::Hash(hash) => Ok(hash),
            other => Err(FixError::type_mismatch(ValueKind::Hash, other.kind())),
        }
    }

    /// Treat any value as a sequence: arrays as themselves, anything else as
    /// a one-element array.
    pub fn into_list(self) -> Array {
        match self {
            Value::Array(array) => array,
            other => Array::from(vec![other]),
        }
    }

    /// Recursively drop empty strings, arrays and hashes below this value.
    pub fn remove_empty_values(&mut self) {
        match self {
            Value::Array(array) => array.remove_empty_values(),
            Value::Hash(hash) => hash.remove_empty_values(),
            Value::String(_) => {}
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", serde_json::Value::from(other)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Array> for Value {
    fn from(array: Array) -> Self {
        Value::Array(array)
    }
}

impl From<Hash> for Value {
    fn from(hash: Hash) -> Self {
        Value::Hash(hash)
    }
}
