//! Session state threaded through the interpreter and every capability.
//!
//! ```text
//! FixContext
//!   ├── vars        $[name] substitutions
//!   ├── maps        MapRegistry (inline, file, host sources)
//!   ├── base_dir    anchor for relative map paths
//!   └── extensions  namespaced functions and predicates
//! ```

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::function::{FixFunction, FixPredicate};
use crate::error::{FixError, FixResult};
use crate::maps::file::FileMapOptions;
use crate::maps::{MapRegistry, MapSource};

/// Separator that marks a namespaced (extension) name.
pub const NAMESPACE_SEPARATOR: char = '.';

static VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\[([^\]\[]*)\]").expect("variable pattern is valid"));

#[derive(Default)]
pub struct FixContext {
    vars: IndexMap<String, String>,
    maps: MapRegistry,
    base_dir: Option<PathBuf>,
    functions: HashMap<String, Arc<dyn FixFunction>>,
    predicates: HashMap<String, Arc<dyn FixPredicate>>,
}

impl FixContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vars(mut self, vars: IndexMap<String, String>) -> Self {
        self.vars = vars;
        self
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    // =========================================================================
    // Variables
    // =========================================================================

    pub fn put_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn vars(&self) -> &IndexMap<String, String> {
        &self.vars
    }

    /// Substitute every known `$[name]` token; unknown tokens stay as written.
    pub fn resolve_vars(&self, input: &str) -> String {
        if !input.contains("$[") {
            return input.to_string();
        }
        VARIABLE
            .replace_all(input, |caps: &Captures| match self.vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    // =========================================================================
    // Maps
    // =========================================================================

    pub fn maps(&self) -> &MapRegistry {
        &self.maps
    }

    pub fn maps_mut(&mut self) -> &mut MapRegistry {
        &mut self.maps
    }

    /// Map registered as `name`, loading it first if `name` looks like a
    /// file path.
    ///
    /// An unknown plain name yields `None`; an unloadable file is an error.
    pub fn map(&mut self, name: &str) -> FixResult<Option<&dyn MapSource>> {
        if !self.maps.contains(name) && is_external(name) {
            self.maps.load_file(
                name,
                name,
                self.base_dir.as_deref(),
                &FileMapOptions::default(),
            )?;
        }
        Ok(self.maps.get(name))
    }

    // =========================================================================
    // Extensions
    // =========================================================================

    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        function: Arc<dyn FixFunction>,
    ) -> FixResult<()> {
        let name = namespaced(name.into())?;
        self.functions.insert(name, function);
        Ok(())
    }

    pub fn register_predicate(
        &mut self,
        name: impl Into<String>,
        predicate: Arc<dyn FixPredicate>,
    ) -> FixResult<()> {
        let name = namespaced(name.into())?;
        self.predicates.insert(name, predicate);
        Ok(())
    }

    pub fn function(&self, name: &str) -> FixResult<Arc<dyn FixFunction>> {
        self.functions
            .get(name)
            .cloned()
            .ok_or_else(|| FixError::UnknownOperation(name.to_string()))
    }

    pub fn predicate(&self, name: &str) -> FixResult<Arc<dyn FixPredicate>> {
        self.predicates
            .get(name)
            .cloned()
            .ok_or_else(|| FixError::UnknownOperation(name.to_string()))
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn has_predicate(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }
}

impl std::fmt::Debug for FixContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut functions: Vec<&String> = self.functions.keys().collect();
        functions.sort();
        let mut predicates: Vec<&String> = self.predicates.keys().collect();
        predicates.sort();
        f.debug_struct("FixContext")
            .field("vars", &self.vars)
            .field("maps", &self.maps)
            .field("base_dir", &self.base_dir)
            .field("functions", &functions)
            .field("predicates", &predicates)
            .finish()
    }
}

/// Whether a name refers to an extension rather than a built-in.
pub fn is_namespaced(name: &str) -> bool {
    name.contains(NAMESPACE_SEPARATOR)
}

fn is_external(name: &str) -> bool {
    is_namespaced(name) || name.contains('/')
}

fn namespaced(name: String) -> FixResult<String> {
    if is_namespaced(&name) {
        Ok(name)
    } else {
        Err(FixError::invalid_argument(
            name,
            "extension names must contain a namespace separator",
        ))
    }
}
