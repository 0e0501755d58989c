//! Batch processing: run one fix over many records.
//!
//! # Example
//!
//! ```rust,ignore
//! use metafix::{EngineConfig, Expression, Metafix, Record};
//!
//! let fix = vec![Expression::call("upcase", &["title"])];
//! let mut metafix = Metafix::with_config(fix, EngineConfig::default())?;
//!
//! let mut output: Vec<Record> = Vec::new();
//! let summary = metafix.process(records, &mut output)?;
//! eprintln!("{}", summary.summary());
//! ```

use serde_json::Value as Json;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, ErrorPolicy};
use crate::error::{FixError, PipelineError, PipelineResult};
use crate::fix::{Expression, FixContext, RecordTransformer};
use crate::record::{Record, ID_FIELD};
use crate::value::Hash;

/// Receiver of transformed records.
pub trait RecordSink {
    fn emit(&mut self, record: Record) -> PipelineResult<()>;
}

impl RecordSink for Vec<Record> {
    fn emit(&mut self, record: Record) -> PipelineResult<()> {
        self.push(record);
        Ok(())
    }
}

/// A record whose fix raised an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRecord {
    /// 0-based position in the input.
    pub index: usize,
    pub message: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub emitted: usize,
    /// Records dropped because `reject()` marked them.
    pub rejected: usize,
    pub failed: Vec<FailedRecord>,
}

impl ProcessSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether every record went through without error.
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Transformed: {} records, {} rejected, {} failed",
            self.emitted,
            self.rejected,
            self.failed.len()
        )
    }
}

/// A fix bound to a context and an error policy.
pub struct Metafix {
    fix: Vec<Expression>,
    context: FixContext,
    config: EngineConfig,
}

impl Metafix {
    pub fn new(fix: Vec<Expression>) -> Self {
        Self {
            fix,
            context: FixContext::new(),
            config: EngineConfig::default(),
        }
    }

    /// Build the context from `config` (variables, base directory, maps).
    pub fn with_config(fix: Vec<Expression>, config: EngineConfig) -> PipelineResult<Self> {
        let context = config.build_context()?;
        Ok(Self {
            fix,
            context,
            config,
        })
    }

    pub fn fix(&self) -> &[Expression] {
        &self.fix
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn context(&self) -> &FixContext {
        &self.context
    }

    /// Context access, e.g. to register extensions or map sources.
    pub fn context_mut(&mut self) -> &mut FixContext {
        &mut self.context
    }

    /// Transform a copy of `record`, leaving the original untouched.
    pub fn transform(&mut self, record: &Record) -> Result<Record, FixError> {
        let (output, result) = self.run(record);
        result.map(|_| output)
    }

    /// Transform every record and emit the results into `sink`.
    ///
    /// Rejected records are emitted only with `emit_rejected`. Failed
    /// records are handled per `on_error`; with [`ErrorPolicy::Halt`] the
    /// first failure ends the run with [`PipelineError::RecordFailed`].
    pub fn process<I, S>(&mut self, records: I, sink: &mut S) -> PipelineResult<ProcessSummary>
    where
        I: IntoIterator<Item = Record>,
        S: RecordSink + ?Sized,
    {
        let mut summary = ProcessSummary::new();

        for (index, mut record) in records.into_iter().enumerate() {
            self.assign_id(&mut record, index);
            let (output, result) = self.run(&record);

            if let Err(error) = result {
                match self.config.on_error {
                    ErrorPolicy::Halt => {
                        return Err(PipelineError::RecordFailed {
                            index,
                            source: error,
                        })
                    }
                    policy => {
                        warn!(record = index, error = %error, ?policy, "Record failed");
                        summary.failed.push(FailedRecord {
                            index,
                            message: error.to_string(),
                        });
                        if policy == ErrorPolicy::Skip {
                            continue;
                        }
                    }
                }
            }

            if output.is_rejected() && !self.config.emit_rejected {
                debug!(record = index, "Record rejected");
                summary.rejected += 1;
                continue;
            }
            sink.emit(output)?;
            summary.emitted += 1;
        }

        info!(
            emitted = summary.emitted,
            rejected = summary.rejected,
            failed = summary.failed.len(),
            "Processed records"
        );
        Ok(summary)
    }

    fn run(&mut self, record: &Record) -> (Record, Result<(), FixError>) {
        let mut transformer = RecordTransformer::new(&mut self.context, record.shallow_clone());
        let result = transformer.process(&self.fix);
        (transformer.into_record(), result)
    }

    /// Set `_id` from the configured field, or the 1-based input position.
    fn assign_id(&self, record: &mut Record, index: usize) {
        if record.virtual_fields().contains_field(ID_FIELD) {
            return;
        }
        let id = self
            .config
            .id_field
            .as_deref()
            .and_then(|field| record.get(field))
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_else(|| (index + 1).to_string());
        record.put_virtual_field(ID_FIELD, id);
    }
}

// =============================================================================
// JSON I/O
// =============================================================================

/// Read a fix (a JSON array of expressions).
pub fn load_fix(path: &Path) -> PipelineResult<Vec<Expression>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Parse records from a JSON array or from JSON Lines.
pub fn parse_records(content: &str) -> PipelineResult<Vec<Record>> {
    let values: Vec<Json> = if content.trim_start().starts_with('[') {
        serde_json::from_str(content)?
    } else {
        serde_json::Deserializer::from_str(content)
            .into_iter::<Json>()
            .collect::<Result<_, _>>()?
    };
    if values.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match value {
            Json::Object(map) => Ok(Record::from(Hash::from_json_map(map))),
            _ => Err(PipelineError::NotAnObject(index)),
        })
        .collect()
}

pub fn load_records(path: &Path) -> PipelineResult<Vec<Record>> {
    parse_records(&std::fs::read_to_string(path)?)
}

/// Regular fields of every record as a JSON array.
pub fn records_to_json(records: &[Record]) -> Json {
    Json::Array(records.iter().map(|record| Json::from(record.as_hash())).collect())
}

impl From<&Record> for Json {
    fn from(record: &Record) -> Self {
        Json::from(record.as_hash())
    }
}
