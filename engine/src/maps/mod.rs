//! Map Registry - named lookup tables for a processing session
//!
//! Maps are registered inline (`put_map`), loaded from files (`put_filemap`
//! or auto-loaded on first `lookup`), or provided by the host as
//! [`MapSource`] implementations.

pub mod file;

use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::MapResult;
use crate::mapping::{Mapping, DEFAULT_KEY};
use file::{load_file_map, resolve_map_path, FileMapOptions};

pub use file::{decode_map_bytes, parse_map};

/// A string-keyed lookup backend.
pub trait MapSource: Send + Sync {
    /// Value stored for `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Value for `key`, falling back to the [`DEFAULT_KEY`] entry.
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).or_else(|| self.get(DEFAULT_KEY))
    }
}

impl MapSource for Mapping {
    fn get(&self, key: &str) -> Option<String> {
        Mapping::get(self, key).cloned()
    }
}

/// Registry of lookup tables by name.
#[derive(Default)]
pub struct MapRegistry {
    maps: HashMap<String, Box<dyn MapSource>>,
}

impl MapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an in-memory map.
    pub fn put_map(&mut self, name: impl Into<String>, mapping: Mapping) {
        let name = name.into();
        debug!(map = %name, entries = mapping.len(), "Registered map");
        self.maps.insert(name, Box::new(mapping));
    }

    /// Register a host-provided backend.
    pub fn register_source(&mut self, name: impl Into<String>, source: Box<dyn MapSource>) {
        self.maps.insert(name.into(), source);
    }

    /// Load a file map and register it as `name`.
    pub fn load_file(
        &mut self,
        name: impl Into<String>,
        path: &str,
        base_dir: Option<&Path>,
        options: &FileMapOptions,
    ) -> MapResult<()> {
        let resolved = resolve_map_path(path, base_dir)?;
        let mapping = load_file_map(&resolved, options)?;
        self.put_map(name, mapping);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn MapSource> {
        self.maps.get(name).map(|source| source.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.maps.contains_key(name)
    }

    /// Registered map names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.maps.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

impl std::fmt::Debug for MapRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapRegistry")
            .field("maps", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct Upcase;

    impl MapSource for Upcase {
        fn get(&self, key: &str) -> Option<String> {
            Some(key.to_uppercase())
        }
    }

    #[test]
    fn test_put_and_get() {
        let mut registry = MapRegistry::new();
        let mapping: Mapping = [("a", "1".to_string()), (DEFAULT_KEY, "0".to_string())]
            .into_iter()
            .collect();
        registry.put_map("digits", mapping);

        let map = registry.get("digits").unwrap();
        assert_eq!(map.lookup("a"), Some("1".to_string()));
        assert_eq!(map.lookup("b"), Some("0".to_string()));
        assert_eq!(map.get("b"), None);
        assert!(registry.get("other").is_none());
    }

    #[test]
    fn test_register_source() {
        let mut registry = MapRegistry::new();
        registry.register_source("org.example.Upcase", Box::new(Upcase));
        assert_eq!(
            registry.get("org.example.Upcase").and_then(|m| m.lookup("moin")),
            Some("MOIN".to_string())
        );
        assert_eq!(registry.names(), vec!["org.example.Upcase"]);
    }

    #[test]
    fn test_load_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("map.csv"), "k;v\n").unwrap();

        let mut registry = MapRegistry::new();
        let options = FileMapOptions::default().with_separator(';');
        registry
            .load_file("csv", "map.csv", Some(dir.path()), &options)
            .unwrap();
        assert_eq!(registry.get("csv").and_then(|m| m.get("k")), Some("v".to_string()));

        assert!(registry
            .load_file("missing", "nope.csv", Some(dir.path()), &options)
            .is_err());
        assert!(!registry.contains("missing"));
    }
}
