//! # Metafix - declarative metadata record transformation
//!
//! A fix is a tree of expressions (function calls, conditionals and list
//! iteration) applied to one record at a time. Records are nested
//! string/array/hash values addressed with dotted wildcard paths.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ JSON record │────▶│   Record    │────▶│ Transformer │────▶│ RecordSink  │
//! │ (array/ndj) │     │ (Hash tree) │     │ (fix + ctx) │     │  (emitted)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                                         ┌──────┴──────┐
//!                                         │ FixContext  │
//!                                         │ vars / maps │
//!                                         └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use metafix::{load_fix, parse_records, EngineConfig, Metafix};
//!
//! let fix = load_fix("fix.json".as_ref())?;
//! let records = parse_records(&std::fs::read_to_string("records.json")?)?;
//!
//! let mut metafix = Metafix::with_config(fix, EngineConfig::default())?;
//! let mut output = Vec::new();
//! let summary = metafix.process(records, &mut output)?;
//! println!("{}", summary.summary());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`value`] - Value model and the wildcard path resolver
//! - [`record`] - Records with virtual fields and the reject flag
//! - [`mapping`] - Lookup tables with a default entry
//! - [`maps`] - Map registry and CSV/TSV file maps
//! - [`fix`] - Expression tree, built-in catalogue and interpreter
//! - [`config`] - Engine configuration
//! - [`pipeline`] - Batch runner and JSON I/O

// Core modules
pub mod error;
pub mod value;
pub mod record;
pub mod mapping;

// Lookup maps
pub mod maps;

// Interpretation
pub mod fix;

// Batch processing
pub mod config;
pub mod pipeline;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{FixError, FixResult, MapError, MapResult, PipelineError, PipelineResult};

// =============================================================================
// Re-exports - Values
// =============================================================================

pub use value::{Array, FixPath, Hash, Value, ValueKind};

// =============================================================================
// Re-exports - Records and mappings
// =============================================================================

pub use mapping::{Mapping, DEFAULT_KEY};
pub use record::{Record, ID_FIELD};

// =============================================================================
// Re-exports - Maps
// =============================================================================

pub use maps::file::FileMapOptions;
pub use maps::{MapRegistry, MapSource};

// =============================================================================
// Re-exports - Fix
// =============================================================================

pub use fix::{
    unresolved_names,
    Expression,
    FixConditional,
    FixContext,
    FixFunction,
    FixMethod,
    FixPredicate,
    Options,
    RecordTransformer,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{EngineConfig, ErrorPolicy, MapConfig};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{
    load_fix,
    load_records,
    parse_records,
    records_to_json,
    FailedRecord,
    Metafix,
    ProcessSummary,
    RecordSink,
};
