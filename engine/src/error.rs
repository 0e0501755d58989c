//! Error types for the Fix engine.
//!
//! The hierarchy mirrors the layers of the engine:
//!
//! - [`MapError`] - lookup table loading (file maps, map sources)
//! - [`FixError`] - record navigation, operation dispatch and execution
//! - [`PipelineError`] - batch processing and I/O around the interpreter
//!
//! Lower layers convert into higher ones via `From`, so `?` works across
//! the boundaries.

use thiserror::Error;

use crate::value::ValueKind;

// =============================================================================
// Map Errors
// =============================================================================

/// Errors while resolving or loading a lookup table.
#[derive(Debug, Error)]
pub enum MapError {
    /// The map file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// A relative map path was given but no base directory is known.
    #[error("Cannot resolve relative path: {0}")]
    RelativePath(String),

    /// Failed to read the map file.
    #[error("Failed to read map '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The map file is not valid CSV/TSV.
    #[error("Invalid map file '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// A key or value column option is not a usable column index.
    #[error("Invalid column '{0}' for map")]
    InvalidColumn(String),

    /// The field separator is not a single-byte (ASCII) character.
    #[error("Invalid separator '{0}' for map: must be ASCII")]
    InvalidSeparator(char),
}

// =============================================================================
// Fix Errors
// =============================================================================

/// Errors raised while interpreting a fix against a record.
///
/// None of these are caught inside the interpreter: the first one aborts the
/// remaining expressions for the current record.
#[derive(Debug, Error)]
pub enum FixError {
    /// An operation required one value variant and found another.
    #[error("expected {expected}, got {actual}")]
    TypeMismatch { expected: ValueKind, actual: ValueKind },

    /// A referenced path segment (field, index or marker) does not exist.
    #[error("Using ref, but can't find: {segment} in: {container}")]
    PathResolution { segment: String, container: String },

    /// Neither a built-in nor a registered extension has this name.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// An external lookup table could not be located or opened.
    #[error(transparent)]
    MapResolution(#[from] MapError),

    /// A numeric string was required.
    #[error("For input string: \"{0}\"")]
    NumberFormat(String),

    /// A user supplied regular expression does not compile.
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A call did not supply a required positional parameter.
    #[error("Missing parameter {index} for '{operation}'")]
    MissingParameter { operation: String, index: usize },

    /// Arguments are present but structurally unusable.
    #[error("Invalid argument for '{operation}': {message}")]
    InvalidArgument { operation: String, message: String },
}

impl FixError {
    /// Shorthand for a [`FixError::TypeMismatch`].
    pub fn type_mismatch(expected: ValueKind, actual: ValueKind) -> Self {
        FixError::TypeMismatch { expected, actual }
    }

    /// Shorthand for a [`FixError::PathResolution`].
    pub fn path_resolution(segment: impl Into<String>, container: impl ToString) -> Self {
        FixError::PathResolution {
            segment: segment.into(),
            container: container.to_string(),
        }
    }

    /// Shorthand for a [`FixError::InvalidArgument`].
    pub fn invalid_argument(operation: impl Into<String>, message: impl Into<String>) -> Self {
        FixError::InvalidArgument {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Errors from batch processing and the I/O around it.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Interpreter error outside of a specific record (e.g. config maps).
    #[error("Fix error: {0}")]
    Fix(#[from] FixError),

    /// A record failed and the error policy is to halt.
    #[error("Record {index} failed: {source}")]
    RecordFailed {
        index: usize,
        #[source]
        source: FixError,
    },

    /// JSON (de)serialization error for fixes, configs or records.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File system error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input records must be JSON objects.
    #[error("Record {0} is not a JSON object")]
    NotAnObject(usize),

    /// No records to process.
    #[error("No records to transform")]
    EmptyInput,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for map loading.
pub type MapResult<T> = Result<T, MapError>;

/// Result type for interpreter operations.
pub type FixResult<T> = Result<T, FixError>;

/// Result type for batch processing.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let map_err = MapError::FileNotFound("animals.tsv".into());
        let fix_err: FixError = map_err.into();
        assert_eq!(fix_err.to_string(), "File not found: animals.tsv");

        let pipeline_err: PipelineError = fix_err.into();
        assert!(pipeline_err.to_string().contains("animals.tsv"));
    }

    #[test]
    fn test_type_mismatch_format() {
        let err = FixError::type_mismatch(ValueKind::String, ValueKind::Array);
        assert_eq!(err.to_string(), "expected String, got Array");
    }

    #[test]
    fn test_path_resolution_format() {
        let err = FixError::path_resolution("$first", "[]");
        assert_eq!(err.to_string(), "Using ref, but can't find: $first in: []");
    }

    #[test]
    fn test_number_format() {
        let err = FixError::NumberFormat("x".into());
        assert_eq!(err.to_string(), "For input string: \"x\"");
    }
}
