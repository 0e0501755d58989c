//! Ordered string-keyed store, used for lookup tables.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Key consulted when a lookup finds no entry.
pub const DEFAULT_KEY: &str = "__default";

/// Ordered association from keys to values.
///
/// `put` ignores absent values and `replace` only touches existing keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mapping<V = String> {
    entries: IndexMap<String, V>,
}

impl<V> Default for Mapping<V> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<V> Mapping<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    /// Entry for `key`, or the [`DEFAULT_KEY`] entry.
    pub fn get_or_default(&self, key: &str) -> Option<&V> {
        self.entries.get(key).or_else(|| self.entries.get(DEFAULT_KEY))
    }

    /// Set `key`; `None` is ignored.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Option<V>>) {
        if let Some(value) = value.into() {
            self.entries.insert(key.into(), value);
        }
    }

    /// Overwrite `key` only if present.
    pub fn replace(&mut self, key: &str, value: V) -> bool {
        match self.entries.get_mut(key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.shift_remove(key)
    }

    /// Keep only the listed keys.
    pub fn retain_keys<S: AsRef<str>>(&mut self, keys: &[S]) {
        self.entries
            .retain(|key, _| keys.iter().any(|k| k.as_ref() == key));
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, V> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }
}

impl Mapping<String> {
    /// Drop entries whose value is the empty string.
    pub fn remove_empty_values(&mut self) {
        self.entries.retain(|_, value| !value.is_empty());
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for Mapping<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
