//! Capability contracts for fix operations, plus the helpers shared by
//! built-ins and extensions.

use regex::Regex;
use tracing::warn;

use super::context::FixContext;
use super::expression::Options;
use crate::error::{FixError, FixResult};
use crate::mapping::Mapping;
use crate::maps::MapSource;
use crate::record::Record;
use crate::value::Value;

/// A fix function: mutates the record it is applied to.
pub trait FixFunction: Send + Sync {
    fn apply(
        &self,
        context: &mut FixContext,
        record: &mut Record,
        params: &[String],
        options: &Options,
    ) -> FixResult<()>;
}

/// A fix predicate: decides a conditional branch.
pub trait FixPredicate: Send + Sync {
    fn test(
        &self,
        context: &FixContext,
        record: &Record,
        params: &[String],
        options: &Options,
    ) -> FixResult<bool>;
}

// =============================================================================
// Parameter and option helpers
// =============================================================================

/// Positional parameter `index` of `operation`.
pub fn param<'a>(operation: &str, params: &'a [String], index: usize) -> FixResult<&'a str> {
    params
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| FixError::MissingParameter {
            operation: operation.to_string(),
            index,
        })
}

/// Boolean option; anything but a case-insensitive `true` is false.
pub fn get_boolean(options: &Options, key: &str) -> bool {
    options
        .get(key)
        .map_or(false, |value| value.eq_ignore_ascii_case("true"))
}

/// Integer option with a default for absent keys.
pub fn get_integer(options: &Options, key: &str, default: i64) -> FixResult<i64> {
    match options.get(key) {
        Some(value) => parse_integer(value),
        None => Ok(default),
    }
}

pub fn parse_integer(input: &str) -> FixResult<i64> {
    input
        .parse()
        .map_err(|_| FixError::NumberFormat(input.to_string()))
}

pub fn compile_regex(pattern: &str) -> FixResult<Regex> {
    Regex::new(pattern).map_err(|source| FixError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

// =============================================================================
// Value helpers
// =============================================================================

/// Drop repeated values, keeping each first occurrence.
pub fn unique(values: Vec<Value>) -> Vec<Value> {
    let mut seen: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

/// Recursively inline nested arrays.
pub fn flatten(values: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut flat = Vec::new();
    for value in values {
        match value {
            Value::Array(array) => flat.extend(flatten(array)),
            other => flat.push(other),
        }
    }
    flat
}

/// Every string reachable from `value`, arrays flattened, hashes skipped.
pub fn strings(value: Value) -> Vec<String> {
    flatten(value.into_list())
        .into_iter()
        .filter_map(|value| match value {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Lookup
// =============================================================================

/// Replace each value at `params[0]` with its mapped counterpart.
///
/// The map is `params[1]` (registered, or auto-loaded if the name looks
/// like a file path); without it the options form an inline map. Values
/// the map does not know fall back to its default entry, then are either
/// kept or, with `delete: true`, removed.
pub fn lookup(
    context: &mut FixContext,
    record: &mut Record,
    params: &[String],
    options: &Options,
) -> FixResult<()> {
    let path = param("lookup", params, 0)?;
    let delete = get_boolean(options, "delete");

    let inline: Mapping;
    let map: Option<&dyn MapSource> = match params.get(1) {
        Some(name) => {
            let map = context.map(name)?;
            if map.is_none() {
                warn!(map = %name, "Unknown map, lookup matches nothing");
            }
            map
        }
        None => {
            inline = options
                .iter()
                .filter(|(key, _)| key.as_str() != "delete")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            Some(&inline as &dyn MapSource)
        }
    };

    record.transform(path, |value| {
        let key = value.as_string()?;
        match map.and_then(|map| map.lookup(key)) {
            Some(mapped) => Ok(Some(Value::String(mapped))),
            None if delete => Ok(None),
            None => Ok(Some(value.clone())),
        }
    })
}
