//! Ordered field-name to value association with wildcard lookup.

use indexmap::IndexMap;

use super::path::{self, FixPath, InsertMode};
use super::pattern::PatternCache;
use super::{Array, Value};
use crate::error::FixResult;

/// Suffix marking a field that always holds an [`Array`].
pub const ARRAY_MARKER: &str = "[]";

/// An ordered map from field names to [`Value`]s.
///
/// Fields keep their insertion order. Lookups by name go through the glob
/// matcher (see [`super::pattern`]), memoized per `Hash`.
#[derive(Clone, Default)]
pub struct Hash {
    fields: IndexMap<String, Value>,
    patterns: PatternCache,
}

impl Hash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in storage order.
    pub fn field_names(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, String, Value> {
        self.fields.iter_mut()
    }

    // =========================================================================
    // Pattern based access
    // =========================================================================

    /// Names of all fields matching `pattern`, in storage order.
    pub fn matching_fields(&self, pattern: &str) -> Vec<String> {
        let compiled = self.patterns.get(pattern);
        if compiled.is_literal() {
            return self
                .fields
                .get_key_value(pattern)
                .map(|(k, _)| vec![k.clone()])
                .unwrap_or_default();
        }
        self.fields
            .keys()
            .filter(|field| compiled.matches(field))
            .cloned()
            .collect()
    }

    pub fn contains_field(&self, pattern: &str) -> bool {
        !self.matching_fields(pattern).is_empty()
    }

    /// Get the value(s) of the fields matching `pattern`.
    ///
    /// One match yields that value, several matches yield an [`Array`] of
    /// them in storage order.
    pub fn get(&self, pattern: &str) -> Option<Value> {
        let mut matches = self.matching_fields(pattern);
        match matches.len() {
            0 => None,
            1 => {
                let field = matches.remove(0);
                self.fields.get(&field).cloned()
            }
            _ => Some(Value::Array(
                matches
                    .iter()
                    .filter_map(|field| self.fields.get(field).cloned())
                    .collect(),
            )),
        }
    }

    /// Exact-name access, no pattern matching.
    pub fn get_field(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_field_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.fields.get_mut(field)
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Set a field, keeping its position if it already exists.
    pub fn put(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Overwrite a field only if it already exists.
    pub fn replace(&mut self, field: &str, value: impl Into<Value>) -> bool {
        match self.fields.get_mut(field) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    /// Add a value, merging into an [`Array`] if the field is already set.
    pub fn add(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        match self.fields.get_mut(&field) {
            Some(existing) => {
                let mut merged = std::mem::take(existing).into_list();
                for element in value.into_list() {
                    merged.add(element);
                }
                *existing = Value::Array(merged);
            }
            None => {
                self.fields.insert(field, value);
            }
        }
    }

    /// Like [`Hash::add`], but a new field ending in `[]` starts as an array.
    pub(crate) fn append_field(&mut self, field: &str, value: Value) {
        if field.ends_with(ARRAY_MARKER) && !self.fields.contains_key(field) {
            self.fields
                .insert(field.to_string(), Value::Array(value.into_list()));
        } else {
            self.add(field, value);
        }
    }

    /// Remove every field matching `pattern`.
    pub fn remove_field(&mut self, pattern: &str) {
        for field in self.matching_fields(pattern) {
            self.fields.shift_remove(&field);
        }
    }

    /// Remove and return a field by exact name.
    pub fn take_field(&mut self, field: &str) -> Option<Value> {
        self.fields.shift_remove(field)
    }

    /// Keep only fields matching one of `patterns`, in storage order.
    pub fn retain_fields<S: AsRef<str>>(&mut self, patterns: &[S]) {
        let keep: Vec<String> = patterns
            .iter()
            .flat_map(|pattern| self.matching_fields(pattern.as_ref()))
            .collect();
        self.fields.retain(|field, _| keep.contains(field));
    }

    /// Recursively drop empty strings, arrays and hashes.
    pub fn remove_empty_values(&mut self) {
        for value in self.fields.values_mut() {
            value.remove_empty_values();
        }
        self.fields.retain(|_, value| !value.is_empty());
    }

    // =========================================================================
    // Path based access
    // =========================================================================

    /// Resolve a dotted path.
    pub fn find(&self, path: &str) -> Option<Value> {
        path::find_in_hash(self, FixPath::new(path).segments())
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.find(path).is_some()
    }

    /// The array stored at `path`, if the path names it directly.
    ///
    /// Only exact field names and index segments (`1`, `$first`, `$last`)
    /// are followed. Paths that collect values across an array or through
    /// a wildcard give `None`.
    pub fn array_mut(&mut self, path: &str) -> Option<&mut Array> {
        path::array_in_hash_mut(self, FixPath::new(path).segments())
    }

    /// Write `value` at `path`, replacing any existing leaf.
    pub fn set_path(&mut self, path: &str, value: impl Into<Value>) -> FixResult<()> {
        path::insert_into_hash(
            self,
            FixPath::new(path).segments(),
            InsertMode::Replace,
            value.into(),
        )
    }

    /// Write `value` at `path`, merging with an existing leaf.
    pub fn append_path(&mut self, path: &str, value: impl Into<Value>) -> FixResult<()> {
        path::insert_into_hash(
            self,
            FixPath::new(path).segments(),
            InsertMode::Append,
            value.into(),
        )
    }

    pub fn remove_path(&mut self, path: &str) {
        path::remove_in_hash(self, FixPath::new(path).segments());
    }

    /// Replace every value addressed by `path` with the result of `f`.
    ///
    /// Returning `None` removes the addressed value.
    pub fn transform<F>(&mut self, path: &str, mut f: F) -> FixResult<()>
    where
        F: FnMut(&Value) -> FixResult<Option<Value>>,
    {
        path::transform_in_hash(self, FixPath::new(path).segments(), &mut f)
    }

    /// Append every value resolved from `old_path` at `new_path`.
    pub fn copy(&mut self, old_path: &str, new_path: &str) -> FixResult<()> {
        let values = self.find(old_path);
        path::copy_values(self, values, &FixPath::new(new_path))
    }
}

impl PartialEq for Hash {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.fields.iter()).finish()
    }
}

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", serde_json::Value::from(self))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Hash {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut hash = Hash::new();
        for (field, value) in iter {
            hash.put(field, value);
        }
        hash
    }
}

impl From<Hash> for Array {
    /// Flatten a hash into `[field, value, field, value, ...]`.
    fn from(hash: Hash) -> Self {
        hash.fields
            .into_iter()
            .flat_map(|(field, value)| [Value::String(field), value])
            .collect()
    }
}
