//! Engine configuration, read from a JSON file.
//!
//! ```json
//! {
//!   "vars": {"source": "catalog"},
//!   "base_dir": "fixes",
//!   "maps": {"languages": {"path": "maps/languages.tsv"}},
//!   "id_field": "id",
//!   "on_error": "skip",
//!   "emit_rejected": false
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{FixError, PipelineResult};
use crate::fix::FixContext;
use crate::maps::file::FileMapOptions;

/// What the batch runner does with a record whose fix fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Drop the record and keep going.
    #[default]
    Skip,
    /// Stop the whole run.
    Halt,
    /// Emit the partially transformed record and keep going.
    Emit,
}

/// A file map preloaded into the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    pub path: String,

    #[serde(flatten)]
    pub options: FileMapOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Initial `$[name]` variables.
    #[serde(default)]
    pub vars: IndexMap<String, String>,

    /// Directory relative map paths resolve against.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    /// Named file maps, loaded before the first record.
    #[serde(default)]
    pub maps: IndexMap<String, MapConfig>,

    /// Input field copied into the virtual `_id` field.
    #[serde(default)]
    pub id_field: Option<String>,

    #[serde(default)]
    pub on_error: ErrorPolicy,

    /// Emit records marked by `reject()`.
    #[serde(default)]
    pub emit_rejected: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            vars: IndexMap::new(),
            base_dir: None,
            maps: IndexMap::new(),
            id_field: None,
            on_error: ErrorPolicy::Skip,
            emit_rejected: false,
        }
    }

    /// Load a configuration file.
    ///
    /// A relative `base_dir` is taken relative to the file's directory, and
    /// defaults to that directory.
    pub fn from_file(path: &Path) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: EngineConfig = serde_json::from_str(&content)?;

        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        config.base_dir = Some(match config.base_dir.take() {
            Some(base) if base.is_relative() => dir.join(base),
            Some(base) => base,
            None => dir,
        });
        debug!(path = %path.display(), maps = config.maps.len(), "Loaded config");
        Ok(config)
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = Some(field.into());
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }

    pub fn with_map(mut self, name: impl Into<String>, path: impl Into<String>, options: FileMapOptions) -> Self {
        self.maps.insert(
            name.into(),
            MapConfig {
                path: path.into(),
                options,
            },
        );
        self
    }

    /// Build a context with the variables, base directory and maps set.
    pub fn build_context(&self) -> PipelineResult<FixContext> {
        let mut context = FixContext::new().with_vars(self.vars.clone());
        if let Some(base_dir) = &self.base_dir {
            context = context.with_base_dir(base_dir.clone());
        }
        for (name, map) in &self.maps {
            let base_dir = self.base_dir.as_deref();
            context
                .maps_mut()
                .load_file(name.clone(), &map.path, base_dir, &map.options)
                .map_err(FixError::from)?;
        }
        Ok(context)
    }
}
