//! Built-in fix functions.
//!
//! Every function is a variant of [`FixMethod`]; the interpreter resolves
//! a call name through [`FixMethod::from_name`]. Most functions take the
//! path to operate on as their first parameter and are applied to each
//! value the path addresses.

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use std::path::Path;
use std::str::FromStr;

use super::context::FixContext;
use super::expression::Options;
use super::function::{
    compile_regex, flatten, get_boolean, lookup, param, parse_integer, strings, unique, FixFunction,
};
use crate::error::{FixError, FixResult, MapError};
use crate::maps::file::FileMapOptions;
use crate::mapping::Mapping;
use crate::record::Record;
use crate::value::path::APPEND;
use crate::value::{Array, Hash, Value, ValueKind};

/// Path that addresses the whole record in `rename`.
const ROOT_PATH: &str = ".";

static GROUP_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\d+)").expect("group reference pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixMethod {
    // Field creation and removal
    AddField,
    SetField,
    SetArray,
    SetHash,
    CopyField,
    MoveField,
    RemoveField,
    Retain,
    Vacuum,
    Reject,
    Nothing,
    Rename,
    Random,
    Paste,
    Hash,
    Array,

    // Strings
    Append,
    Prepend,
    Upcase,
    Downcase,
    Capitalize,
    Trim,
    ReplaceAll,
    Substring,
    Index,
    Format,
    ParseText,

    // Collections
    Count,
    Filter,
    JoinField,
    SplitField,
    SortField,
    Sum,
    Uniq,
    Reverse,
    Flatten,

    // Maps and variables
    PutMap,
    PutFilemap,
    PutVar,
    PutVars,
    Lookup,
}

impl FixMethod {
    pub const ALL: &'static [FixMethod] = &[
        FixMethod::AddField,
        FixMethod::SetField,
        FixMethod::SetArray,
        FixMethod::SetHash,
        FixMethod::CopyField,
        FixMethod::MoveField,
        FixMethod::RemoveField,
        FixMethod::Retain,
        FixMethod::Vacuum,
        FixMethod::Reject,
        FixMethod::Nothing,
        FixMethod::Rename,
        FixMethod::Random,
        FixMethod::Paste,
        FixMethod::Hash,
        FixMethod::Array,
        FixMethod::Append,
        FixMethod::Prepend,
        FixMethod::Upcase,
        FixMethod::Downcase,
        FixMethod::Capitalize,
        FixMethod::Trim,
        FixMethod::ReplaceAll,
        FixMethod::Substring,
        FixMethod::Index,
        FixMethod::Format,
        FixMethod::ParseText,
        FixMethod::Count,
        FixMethod::Filter,
        FixMethod::JoinField,
        FixMethod::SplitField,
        FixMethod::SortField,
        FixMethod::Sum,
        FixMethod::Uniq,
        FixMethod::Reverse,
        FixMethod::Flatten,
        FixMethod::PutMap,
        FixMethod::PutFilemap,
        FixMethod::PutVar,
        FixMethod::PutVars,
        FixMethod::Lookup,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FixMethod::AddField => "add_field",
            FixMethod::SetField => "set_field",
            FixMethod::SetArray => "set_array",
            FixMethod::SetHash => "set_hash",
            FixMethod::CopyField => "copy_field",
            FixMethod::MoveField => "move_field",
            FixMethod::RemoveField => "remove_field",
            FixMethod::Retain => "retain",
            FixMethod::Vacuum => "vacuum",
            FixMethod::Reject => "reject",
            FixMethod::Nothing => "nothing",
            FixMethod::Rename => "rename",
            FixMethod::Random => "random",
            FixMethod::Paste => "paste",
            FixMethod::Hash => "hash",
            FixMethod::Array => "array",
            FixMethod::Append => "append",
            FixMethod::Prepend => "prepend",
            FixMethod::Upcase => "upcase",
            FixMethod::Downcase => "downcase",
            FixMethod::Capitalize => "capitalize",
            FixMethod::Trim => "trim",
            FixMethod::ReplaceAll => "replace_all",
            FixMethod::Substring => "substring",
            FixMethod::Index => "index",
            FixMethod::Format => "format",
            FixMethod::ParseText => "parse_text",
            FixMethod::Count => "count",
            FixMethod::Filter => "filter",
            FixMethod::JoinField => "join_field",
            FixMethod::SplitField => "split_field",
            FixMethod::SortField => "sort_field",
            FixMethod::Sum => "sum",
            FixMethod::Uniq => "uniq",
            FixMethod::Reverse => "reverse",
            FixMethod::Flatten => "flatten",
            FixMethod::PutMap => "put_map",
            FixMethod::PutFilemap => "put_filemap",
            FixMethod::PutVar => "put_var",
            FixMethod::PutVars => "put_vars",
            FixMethod::Lookup => "lookup",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|method| method.name() == name)
    }
}

impl FromStr for FixMethod {
    type Err = FixError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::from_name(name).ok_or_else(|| FixError::UnknownOperation(name.to_string()))
    }
}

impl std::fmt::Display for FixMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FixFunction for FixMethod {
    fn apply(
        &self,
        context: &mut FixContext,
        record: &mut Record,
        params: &[String],
        options: &Options,
    ) -> FixResult<()> {
        let name = self.name();
        let arg = move |index: usize| param(name, params, index);

        match self {
            FixMethod::AddField => record.append_path(arg(0)?, arg(1)?),
            FixMethod::SetField => record.set_path(arg(0)?, arg(1)?),
            FixMethod::SetArray => set_array(record, arg(0)?, &params[1..]),
            FixMethod::SetHash => {
                let hash: Hash = options
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                record.set_path(arg(0)?, hash)
            }
            FixMethod::CopyField => record.copy(arg(0)?, arg(1)?),
            FixMethod::MoveField => {
                let from = arg(0)?;
                record.copy(from, arg(1)?)?;
                record.remove_path(from);
                Ok(())
            }
            FixMethod::RemoveField => {
                for path in params {
                    record.remove_path(path);
                }
                Ok(())
            }
            FixMethod::Retain => {
                record.retain_fields(params);
                Ok(())
            }
            FixMethod::Vacuum => {
                record.remove_empty_values();
                Ok(())
            }
            FixMethod::Reject => {
                record.set_reject(true);
                Ok(())
            }
            FixMethod::Nothing => Ok(()),
            FixMethod::Rename => rename(record, arg(0)?, arg(1)?, arg(2)?),
            FixMethod::Random => random(record, arg(0)?, arg(1)?),
            FixMethod::Paste => paste(record, arg(0)?, &params[1..], options),
            FixMethod::Hash => record.transform(arg(0)?, |value| {
                let array = value.as_array()?;
                if array.len() % 2 != 0 {
                    return Err(FixError::invalid_argument(
                        "hash",
                        format!("odd number of values: {}", array.len()),
                    ));
                }
                let mut hash = Hash::new();
                for pair in array.as_slice().chunks(2) {
                    hash.add(pair[0].as_string()?, pair[1].clone());
                }
                Ok(Some(Value::Hash(hash)))
            }),
            FixMethod::Array => record.transform(arg(0)?, |value| {
                Ok(Some(Value::Array(Array::from(value.as_hash()?.clone()))))
            }),

            FixMethod::Append => {
                let suffix = arg(1)?;
                map_strings(record, arg(0)?, |s| Ok(format!("{}{}", s, suffix)))
            }
            FixMethod::Prepend => {
                let prefix = arg(1)?;
                map_strings(record, arg(0)?, |s| Ok(format!("{}{}", prefix, s)))
            }
            FixMethod::Upcase => map_strings(record, arg(0)?, |s| Ok(s.to_uppercase())),
            FixMethod::Downcase => map_strings(record, arg(0)?, |s| Ok(s.to_lowercase())),
            FixMethod::Capitalize => map_strings(record, arg(0)?, |s| Ok(capitalize(s))),
            FixMethod::Trim => map_strings(record, arg(0)?, |s| Ok(s.trim().to_string())),
            FixMethod::ReplaceAll => {
                let pattern = compile_regex(arg(1)?)?;
                let replacement = group_references(arg(2)?);
                map_strings(record, arg(0)?, |s| {
                    Ok(pattern.replace_all(s, replacement.as_str()).into_owned())
                })
            }
            FixMethod::Substring => {
                let start = parse_integer(arg(1)?)?;
                let end = parse_integer(arg(2)?)?;
                map_strings(record, arg(0)?, |s| Ok(substring(s, start, end)))
            }
            FixMethod::Index => {
                let needle = arg(1)?;
                map_strings(record, arg(0)?, |s| Ok(char_index(s, needle).to_string()))
            }
            FixMethod::Format => {
                let format = arg(1)?;
                record.transform(arg(0)?, |value| {
                    let values = strings(value.clone());
                    Ok(Some(Value::String(format_values(format, &values)?)))
                })
            }
            FixMethod::ParseText => parse_text(record, arg(0)?, arg(1)?),

            FixMethod::Count => record.transform(arg(0)?, |value| {
                let size = match value {
                    Value::Array(array) => array.len(),
                    Value::Hash(hash) => hash.len(),
                    Value::String(_) => 1,
                };
                Ok(Some(Value::String(size.to_string())))
            }),
            FixMethod::Filter => {
                let pattern = compile_regex(arg(1)?)?;
                let invert = get_boolean(options, "invert");
                record.transform(arg(0)?, |value| {
                    let mut array = value.clone().into_list();
                    array.retain(|element| {
                        element.as_str().map_or(false, |s| pattern.is_match(s)) != invert
                    });
                    Ok(Some(Value::Array(array)))
                })
            }
            FixMethod::JoinField => {
                let separator = params.get(1).map_or("", String::as_str);
                record.transform(arg(0)?, |value| {
                    Ok(Some(Value::String(strings(value.clone()).join(separator))))
                })
            }
            FixMethod::SplitField => {
                let pattern = compile_regex(arg(1)?)?;
                record.transform(arg(0)?, |value| Ok(Some(split_value(value, &pattern))))
            }
            FixMethod::SortField => sort_field(record, arg(0)?, options),
            FixMethod::Sum => record.transform(arg(0)?, |value| {
                let mut total: i64 = 0;
                for element in flatten(value.clone().into_list()) {
                    total = total
                        .checked_add(parse_integer(element.as_string()?)?)
                        .ok_or_else(|| FixError::invalid_argument(name, "sum out of integer range"))?;
                }
                Ok(Some(Value::String(total.to_string())))
            }),
            FixMethod::Uniq => record.transform(arg(0)?, |value| {
                let values = unique(value.clone().into_list().into_vec());
                Ok(Some(Value::Array(Array::from(values))))
            }),
            FixMethod::Reverse => record.transform(arg(0)?, |value| match value {
                Value::String(s) => Ok(Some(Value::String(s.chars().rev().collect()))),
                Value::Array(array) => {
                    let mut reversed = array.clone();
                    reversed.reverse();
                    Ok(Some(Value::Array(reversed)))
                }
                Value::Hash(_) => Err(FixError::type_mismatch(ValueKind::Array, ValueKind::Hash)),
            }),
            FixMethod::Flatten => record.transform(arg(0)?, |value| {
                Ok(Some(Value::Array(Array::from(flatten(value.clone().into_list())))))
            }),

            FixMethod::PutMap => {
                let mapping: Mapping = options
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                context.maps_mut().put_map(arg(0)?, mapping);
                Ok(())
            }
            FixMethod::PutFilemap => {
                let path = arg(0)?;
                let map_name = params.get(1).map_or(path, String::as_str);
                let map_options = file_map_options(options)?;
                let base_dir = context.base_dir().map(Path::to_path_buf);
                context
                    .maps_mut()
                    .load_file(map_name, path, base_dir.as_deref(), &map_options)?;
                Ok(())
            }
            FixMethod::PutVar => {
                context.put_var(arg(0)?, arg(1)?);
                Ok(())
            }
            FixMethod::PutVars => {
                for (key, value) in options {
                    context.put_var(key.clone(), value.clone());
                }
                Ok(())
            }
            FixMethod::Lookup => lookup(context, record, params, options),
        }
    }
}

// =============================================================================
// Field functions
// =============================================================================

/// Write `values` as an array, or append them one by one to `..$append`.
fn set_array(record: &mut Record, path: &str, values: &[String]) -> FixResult<()> {
    if path.ends_with(APPEND) {
        for value in values {
            record.append_path(path, value.as_str())?;
        }
        Ok(())
    } else {
        let array: Array = values.iter().map(|v| Value::from(v.as_str())).collect();
        record.set_path(path, array)
    }
}

fn rename(record: &mut Record, path: &str, search: &str, replacement: &str) -> FixResult<()> {
    let pattern = compile_regex(search)?;
    let replacement = group_references(replacement);

    if path == ROOT_PATH {
        let renamed = rename_hash(record.as_hash(), &pattern, &replacement);
        **record = renamed;
        Ok(())
    } else {
        record.transform(path, |value| Ok(Some(rename_value(value, &pattern, &replacement))))
    }
}

fn rename_value(value: &Value, pattern: &Regex, replacement: &str) -> Value {
    match value {
        Value::Hash(hash) => Value::Hash(rename_hash(hash, pattern, replacement)),
        Value::Array(array) => Value::Array(
            array
                .iter()
                .map(|element| rename_value(element, pattern, replacement))
                .collect(),
        ),
        Value::String(_) => value.clone(),
    }
}

fn rename_hash(hash: &Hash, pattern: &Regex, replacement: &str) -> Hash {
    hash.iter()
        .map(|(field, value)| {
            (
                pattern.replace_all(field, replacement).into_owned(),
                rename_value(value, pattern, replacement),
            )
        })
        .collect()
}

fn random(record: &mut Record, path: &str, max: &str) -> FixResult<()> {
    let bound = parse_integer(max)?;
    if bound <= 0 {
        return Err(FixError::invalid_argument(
            "random",
            format!("bound must be positive: {}", bound),
        ));
    }
    let number = rand::thread_rng().gen_range(0..bound);
    record.set_path(path, number.to_string())
}

/// Join source values (or `~literal`s) into `target`.
fn paste(record: &mut Record, target: &str, sources: &[String], options: &Options) -> FixResult<()> {
    let join_char = options.get("join_char").map_or(" ", String::as_str);
    let mut parts = Vec::new();
    for source in sources {
        match source.strip_prefix('~') {
            Some(literal) => parts.push(literal.to_string()),
            None => {
                if let Some(value) = record.find(source) {
                    parts.extend(strings(value));
                }
            }
        }
    }
    record.set_path(target, parts.join(join_char))
}

// =============================================================================
// String functions
// =============================================================================

/// Apply `f` to each string at `path`; non-string values are a type mismatch.
fn map_strings<F>(record: &mut Record, path: &str, mut f: F) -> FixResult<()>
where
    F: FnMut(&str) -> FixResult<String>,
{
    record.transform(path, |value| Ok(Some(Value::String(f(value.as_string()?)?))))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Rewrite `$1` group references into the `${1}` form.
fn group_references(replacement: &str) -> String {
    GROUP_REFERENCE
        .replace_all(replacement, "$${${1}}")
        .into_owned()
}

/// Characters `start .. end - 1`, clamped to the string.
fn substring(s: &str, start: i64, end: i64) -> String {
    let start = start.max(0) as usize;
    let end = (end - 1).max(0) as usize;
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

/// Character position of the first `needle`, or -1.
fn char_index(s: &str, needle: &str) -> i64 {
    s.find(needle)
        .map_or(-1, |byte| s[..byte].chars().count() as i64)
}

/// Render `%s`, `%Ns`, `%-Ns` and `%%` directives.
/// Largest padding width a `format` directive may request.
const MAX_FORMAT_WIDTH: usize = 4096;

fn format_values(format: &str, values: &[String]) -> FixResult<String> {
    let mut output = String::new();
    let mut args = values.iter();
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            output.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            output.push('%');
            continue;
        }

        let left = chars.peek() == Some(&'-');
        if left {
            chars.next();
        }
        let mut width = String::new();
        while let Some(digit) = chars.peek().filter(|d| d.is_ascii_digit()) {
            width.push(*digit);
            chars.next();
        }
        match chars.next() {
            Some('s') => {}
            other => {
                return Err(FixError::invalid_argument(
                    "format",
                    format!("unsupported directive: %{}", other.map(String::from).unwrap_or_default()),
                ))
            }
        }

        let arg = args
            .next()
            .ok_or_else(|| FixError::invalid_argument("format", "not enough values"))?;
        let width = match width.parse::<usize>() {
            _ if width.is_empty() => 0,
            Ok(width) if width <= MAX_FORMAT_WIDTH => width,
            _ => {
                return Err(FixError::invalid_argument(
                    "format",
                    format!("width {} exceeds {}", width, MAX_FORMAT_WIDTH),
                ))
            }
        };
        if left {
            output.push_str(&format!("{:<width$}", arg, width = width));
        } else {
            output.push_str(&format!("{:>width$}", arg, width = width));
        }
    }
    Ok(output)
}

/// Named groups become a hash, positional groups an array.
fn parse_text(record: &mut Record, path: &str, pattern: &str) -> FixResult<()> {
    let pattern = compile_regex(pattern)?;
    let names: Vec<&str> = pattern.capture_names().flatten().collect();

    record.transform(path, |value| {
        let text = value.as_string()?;
        let Some(captures) = pattern.captures(text) else {
            return Ok(Some(value.clone()));
        };
        if names.is_empty() {
            let groups: Array = captures
                .iter()
                .skip(1)
                .flatten()
                .map(|group| Value::from(group.as_str()))
                .collect();
            Ok(Some(Value::Array(groups)))
        } else {
            let groups: Hash = names
                .iter()
                .filter_map(|name| captures.name(name).map(|group| (*name, group.as_str())))
                .collect();
            Ok(Some(Value::Hash(groups)))
        }
    })
}

// =============================================================================
// Collection functions
// =============================================================================

fn split_value(value: &Value, pattern: &Regex) -> Value {
    match value {
        Value::String(s) => Value::Array(pattern.split(s).map(Value::from).collect()),
        Value::Array(array) => Value::Array(
            array
                .iter()
                .flat_map(|element| split_value(element, pattern).into_list())
                .collect(),
        ),
        Value::Hash(hash) => Value::Hash(
            hash.iter()
                .map(|(field, value)| (field.clone(), split_value(value, pattern)))
                .collect(),
        ),
    }
}

fn sort_field(record: &mut Record, path: &str, options: &Options) -> FixResult<()> {
    let numeric = get_boolean(options, "numeric");
    let reverse = get_boolean(options, "reverse");
    let uniq = get_boolean(options, "uniq");

    record.transform(path, |value| {
        let mut values = flatten(value.clone().into_list());
        if uniq {
            values = unique(values);
        }
        let mut sorted = values
            .iter()
            .map(Value::as_string)
            .collect::<FixResult<Vec<&str>>>()?;

        if numeric {
            let mut keyed = sorted
                .into_iter()
                .map(|s| parse_integer(s).map(|n| (n, s)))
                .collect::<FixResult<Vec<(i64, &str)>>>()?;
            keyed.sort_by_key(|(n, _)| *n);
            sorted = keyed.into_iter().map(|(_, s)| s).collect();
        } else {
            sorted.sort_unstable();
        }
        if reverse {
            sorted.reverse();
        }
        Ok(Some(Value::Array(sorted.into_iter().map(Value::from).collect())))
    })
}

// =============================================================================
// Maps
// =============================================================================

fn file_map_options(options: &Options) -> FixResult<FileMapOptions> {
    let mut map_options = FileMapOptions::default();
    if let Some(sep_char) = options.get("sep_char") {
        let mut chars = sep_char.chars();
        map_options.sep_char = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii() => c,
            _ => {
                return Err(FixError::invalid_argument(
                    "put_filemap",
                    format!("sep_char must be one ASCII character, got '{}'", sep_char),
                ))
            }
        };
    }
    if let Some(column) = options.get("key_column") {
        map_options.key_column = parse_column(column)?;
    }
    if let Some(column) = options.get("value_column") {
        map_options.value_column = parse_column(column)?;
    }
    map_options.encoding = options.get("encoding").cloned();
    Ok(map_options)
}

fn parse_column(column: &str) -> FixResult<usize> {
    column
        .parse()
        .map_err(|_| MapError::InvalidColumn(column.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn record(json: serde_json::Value) -> Record {
        Record::from(Value::from_json(json).unwrap().into_hash().unwrap())
    }

    fn run(record: &mut Record, name: &str, params: &[&str]) -> FixResult<()> {
        run_with(&mut FixContext::new(), record, name, params, &[])
    }

    fn run_with(
        context: &mut FixContext,
        record: &mut Record,
        name: &str,
        params: &[&str],
        options: &[(&str, &str)],
    ) -> FixResult<()> {
        let method: FixMethod = name.parse()?;
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        let options: Options = options
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        method.apply(context, record, &params, &options)
    }

    fn json_of(record: &Record) -> serde_json::Value {
        serde_json::Value::from(record.as_hash())
    }

    #[test]
    fn test_names_round_trip() {
        for method in FixMethod::ALL {
            assert_eq!(FixMethod::from_name(method.name()), Some(*method));
        }
        assert!(matches!(
            "no_such_fn".parse::<FixMethod>(),
            Err(FixError::UnknownOperation(name)) if name == "no_such_fn"
        ));
    }

    #[test]
    fn test_add_field_append_marker() {
        let mut rec = record(json!({"animals[]": ["cat", "dog", "fox"]}));
        run(&mut rec, "add_field", &["animals[].$append", "duck"]).unwrap();
        assert_eq!(json_of(&rec), json!({"animals[]": ["cat", "dog", "fox", "duck"]}));
    }

    #[test]
    fn test_add_and_set_field() {
        let mut rec = Record::new();
        run(&mut rec, "add_field", &["a", "1"]).unwrap();
        run(&mut rec, "add_field", &["a", "2"]).unwrap();
        run(&mut rec, "set_field", &["b.c", "3"]).unwrap();
        assert_eq!(json_of(&rec), json!({"a": ["1", "2"], "b": {"c": "3"}}));

        run(&mut rec, "set_field", &["a", "x"]).unwrap();
        assert_eq!(rec.get("a"), Some(Value::from("x")));
    }

    #[test]
    fn test_set_array_and_hash() {
        let mut rec = Record::new();
        run(&mut rec, "set_array", &["list[]", "a", "b"]).unwrap();
        run(&mut rec, "set_array", &["list[].$append", "c", "d"]).unwrap();
        run_with(&mut FixContext::new(), &mut rec, "set_hash", &["info"], &[("k", "v")]).unwrap();
        assert_eq!(
            json_of(&rec),
            json!({"list[]": ["a", "b", "c", "d"], "info": {"k": "v"}})
        );
    }

    #[test]
    fn test_move_and_remove_field() {
        let mut rec = record(json!({"a": "1", "b": "2", "c": "3"}));
        run(&mut rec, "move_field", &["a", "z"]).unwrap();
        run(&mut rec, "remove_field", &["b", "missing"]).unwrap();
        assert_eq!(json_of(&rec), json!({"c": "3", "z": "1"}));
    }

    #[test]
    fn test_vacuum_and_reject() {
        let mut rec = record(json!({"a": "", "b": {"c": ""}, "d": "x"}));
        run(&mut rec, "vacuum", &[]).unwrap();
        assert_eq!(json_of(&rec), json!({"d": "x"}));

        run(&mut rec, "reject", &[]).unwrap();
        assert!(rec.is_rejected());
        run(&mut rec, "set_field", &["after", "reject"]).unwrap();
        assert!(rec.contains_field("after"));
    }

    #[test]
    fn test_rename_keys() {
        let mut rec = record(json!({"your": {"name": "nicolas"}}));
        run(&mut rec, "rename", &["your", "[ae]", "X"]).unwrap();
        assert_eq!(json_of(&rec), json!({"your": {"nXmX": "nicolas"}}));

        let mut rec = record(json!({"animals": [{"animal": "dog"}], "other": "x"}));
        run(&mut rec, "rename", &[".", "ani", "XY"]).unwrap();
        assert_eq!(json_of(&rec), json!({"XYmals": [{"XYmal": "dog"}], "other": "x"}));
    }

    #[test]
    fn test_random() {
        let mut rec = Record::new();
        run(&mut rec, "random", &["n", "10"]).unwrap();
        let n: i64 = rec.get("n").unwrap().as_string().unwrap().parse().unwrap();
        assert!((0..10).contains(&n));

        assert!(matches!(
            run(&mut rec, "random", &["n", "x"]),
            Err(FixError::NumberFormat(_))
        ));
        assert!(run(&mut rec, "random", &["n", "0"]).is_err());
    }

    #[test]
    fn test_paste() {
        let mut rec = record(json!({"first": "Jane", "last": "Doe", "tags": ["a", "b"]}));
        run(&mut rec, "paste", &["full", "first", "last", "~!"]).unwrap();
        assert_eq!(rec.get("full"), Some(Value::from("Jane Doe !")));

        run_with(&mut FixContext::new(), &mut rec, "paste", &["joined", "tags", "missing"], &[("join_char", "-")])
            .unwrap();
        assert_eq!(rec.get("joined"), Some(Value::from("a-b")));
    }

    #[test]
    fn test_hash_and_array() {
        let mut rec = record(json!({"pairs": ["a", "1", "b", "2"], "info": {"x": "1"}}));
        run(&mut rec, "hash", &["pairs"]).unwrap();
        run(&mut rec, "array", &["info"]).unwrap();
        assert_eq!(
            json_of(&rec),
            json!({"pairs": {"a": "1", "b": "2"}, "info": ["x", "1"]})
        );

        let mut odd = record(json!({"pairs": ["a", "1", "b"]}));
        assert!(matches!(
            run(&mut odd, "hash", &["pairs"]),
            Err(FixError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_string_functions() {
        let mut rec = record(json!({"title": "  marc  ", "name": "metafix"}));
        run(&mut rec, "trim", &["title"]).unwrap();
        run(&mut rec, "append", &["title", "!"]).unwrap();
        run(&mut rec, "prepend", &["title", "<"]).unwrap();
        run(&mut rec, "capitalize", &["name"]).unwrap();
        assert_eq!(json_of(&rec), json!({"title": "<marc!", "name": "Metafix"}));

        run(&mut rec, "upcase", &["title"]).unwrap();
        assert_eq!(rec.get("title"), Some(Value::from("<MARC!")));
        run(&mut rec, "downcase", &["title"]).unwrap();
        assert_eq!(rec.get("title"), Some(Value::from("<marc!")));
    }

    #[test]
    fn test_string_function_on_array_fails() {
        let mut rec = record(json!({"title": ["a", "b"]}));
        let err = run(&mut rec, "upcase", &["title"]).unwrap_err();
        assert_eq!(err.to_string(), "expected String, got Array");

        run(&mut rec, "upcase", &["title.*"]).unwrap();
        assert_eq!(json_of(&rec), json!({"title": ["A", "B"]}));
    }

    #[test]
    fn test_replace_all_with_groups() {
        let mut rec = record(json!({"date": "2021-12-24"}));
        run(&mut rec, "replace_all", &["date", r"(\d+)-(\d+)-(\d+)", "$3.$2.$1"]).unwrap();
        assert_eq!(rec.get("date"), Some(Value::from("24.12.2021")));

        assert!(matches!(
            run(&mut rec, "replace_all", &["date", "(", "x"]),
            Err(FixError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_substring_and_index() {
        let mut rec = record(json!({"title": "marc", "animal": "bunny"}));
        run(&mut rec, "substring", &["title", "0", "2"]).unwrap();
        run(&mut rec, "index", &["animal", "n"]).unwrap();
        assert_eq!(json_of(&rec), json!({"title": "m", "animal": "2"}));

        let mut rec = record(json!({"title": "metafix"}));
        run(&mut rec, "index", &["title", "q"]).unwrap();
        assert_eq!(rec.get("title"), Some(Value::from("-1")));
    }

    #[test]
    fn test_format() {
        let mut rec = record(json!({"number": "41", "names": ["a", "b"]}));
        run(&mut rec, "format", &["number", "%-5s|%%"]).unwrap();
        run(&mut rec, "format", &["names", "%3s:%s"]).unwrap();
        assert_eq!(json_of(&rec), json!({"number": "41   |%", "names": "  a:b"}));

        assert!(run(&mut rec, "format", &["number", "%s %s"]).is_err());
        assert!(run(&mut rec, "format", &["number", "%d"]).is_err());
    }

    #[test]
    fn test_format_width_limit() {
        let mut rec = record(json!({"number": "41"}));
        let err = run(&mut rec, "format", &["number", "%99999999999s"]).unwrap_err();
        assert!(matches!(err, FixError::InvalidArgument { .. }));
        assert!(run(&mut rec, "format", &["number", "%99999999999999999999999s"]).is_err());
        assert_eq!(rec.get("number"), Some(Value::from("41")));

        run(&mut rec, "format", &["number", "%4s"]).unwrap();
        assert_eq!(rec.get("number"), Some(Value::from("  41")));
    }

    #[test]
    fn test_parse_text() {
        let mut rec = record(json!({"date": "2015-03-07", "name": "Doe, Jane", "other": "x"}));
        run(&mut rec, "parse_text", &["date", r"(?<year>\d+)-(?<month>\d+)-(?<day>\d+)"]).unwrap();
        run(&mut rec, "parse_text", &["name", r"(\w+), (\w+)"]).unwrap();
        run(&mut rec, "parse_text", &["other", r"(\d+)"]).unwrap();
        assert_eq!(
            json_of(&rec),
            json!({
                "date": {"year": "2015", "month": "03", "day": "07"},
                "name": ["Doe", "Jane"],
                "other": "x"
            })
        );
    }

    #[test]
    fn test_count() {
        let mut rec = record(json!({"numbers": ["41", "42", "6", "6"], "person": {"name": "F", "age": "12"}}));
        run(&mut rec, "count", &["numbers"]).unwrap();
        run(&mut rec, "count", &["person"]).unwrap();
        assert_eq!(json_of(&rec), json!({"numbers": "4", "person": "2"}));
    }

    #[test]
    fn test_filter() {
        let animals = json!({"animals": ["Lion", "Cat", "Tiger", "Bobcat"]});
        let mut rec = record(animals.clone());
        run(&mut rec, "filter", &["animals", "[Cc]at"]).unwrap();
        assert_eq!(json_of(&rec), json!({"animals": ["Cat", "Bobcat"]}));

        let mut rec = record(animals);
        run_with(&mut FixContext::new(), &mut rec, "filter", &["animals", "[Cc]at"], &[("invert", "true")])
            .unwrap();
        assert_eq!(json_of(&rec), json!({"animals": ["Lion", "Tiger"]}));
    }

    #[test]
    fn test_join_and_split() {
        let mut rec = record(json!({"numbers": ["6", "42", "41", "6"], "plain": ["a", "b"]}));
        run(&mut rec, "join_field", &["numbers", "/"]).unwrap();
        run(&mut rec, "join_field", &["plain"]).unwrap();
        assert_eq!(json_of(&rec), json!({"numbers": "6/42/41/6", "plain": "ab"}));

        run(&mut rec, "split_field", &["numbers", "/"]).unwrap();
        assert_eq!(rec.get("numbers").unwrap().as_array().unwrap().len(), 4);

        let mut rec = record(json!({"list": ["a b", "c"], "h": {"x": "1 2"}}));
        run(&mut rec, "split_field", &["list", " "]).unwrap();
        run(&mut rec, "split_field", &["h", " "]).unwrap();
        assert_eq!(
            json_of(&rec),
            json!({"list": ["a", "b", "c"], "h": {"x": ["1", "2"]}})
        );
    }

    #[test]
    fn test_sort_field() {
        let numbers = json!({"numbers": ["6", "42", "41", "6"]});
        let mut rec = record(numbers.clone());
        run(&mut rec, "sort_field", &["numbers"]).unwrap();
        assert_eq!(json_of(&rec), json!({"numbers": ["41", "42", "6", "6"]}));

        let mut rec = record(numbers.clone());
        run_with(
            &mut FixContext::new(),
            &mut rec,
            "sort_field",
            &["numbers"],
            &[("numeric", "true"), ("reverse", "true"), ("uniq", "true")],
        )
        .unwrap();
        assert_eq!(json_of(&rec), json!({"numbers": ["42", "41", "6"]}));

        let mut rec = record(json!({"numbers": ["6", "x"]}));
        let err = run_with(&mut FixContext::new(), &mut rec, "sort_field", &["numbers"], &[("numeric", "true")])
            .unwrap_err();
        assert_eq!(err.to_string(), "For input string: \"x\"");
    }

    #[test]
    fn test_sum_uniq_reverse_flatten() {
        let mut rec = record(json!({
            "numbers": ["41", "42", "6", "6"],
            "dupes": ["a", "b", "a"],
            "title": "metafix",
            "list": ["marc", "json"],
            "nested": ["a", ["b", ["c"]]]
        }));
        run(&mut rec, "sum", &["numbers"]).unwrap();
        run(&mut rec, "uniq", &["dupes"]).unwrap();
        run(&mut rec, "reverse", &["title"]).unwrap();
        run(&mut rec, "reverse", &["list"]).unwrap();
        run(&mut rec, "flatten", &["nested"]).unwrap();
        assert_eq!(
            json_of(&rec),
            json!({
                "numbers": "95",
                "dupes": ["a", "b"],
                "title": "xifatem",
                "list": ["json", "marc"],
                "nested": ["a", "b", "c"]
            })
        );
    }

    #[test]
    fn test_sum_overflow() {
        let mut rec = record(json!({"n": ["9223372036854775807", "1"], "m": ["-5", "7"]}));
        let err = run(&mut rec, "sum", &["n"]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument for 'sum': sum out of integer range");
        run(&mut rec, "sum", &["m"]).unwrap();
        assert_eq!(rec.get("m"), Some(Value::from("2")));
    }

    #[test]
    fn test_put_map_and_lookup() {
        let mut context = FixContext::new();
        let mut rec = record(json!({"greeting": "Moin"}));
        run_with(&mut context, &mut rec, "put_map", &["greetings"], &[("Moin", "Moin zäme")]).unwrap();
        run_with(&mut context, &mut rec, "lookup", &["greeting", "greetings"], &[]).unwrap();
        assert_eq!(rec.get("greeting"), Some(Value::from("Moin zäme")));
    }

    #[test]
    fn test_put_filemap() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("greetings.csv"), "x;Aloha;Alohaeha\n").unwrap();

        let mut context = FixContext::new().with_base_dir(dir.path());
        let mut rec = record(json!({"greeting": "Aloha"}));
        run_with(
            &mut context,
            &mut rec,
            "put_filemap",
            &["greetings.csv", "greetings"],
            &[("sep_char", ";"), ("key_column", "1"), ("value_column", "2")],
        )
        .unwrap();
        run_with(&mut context, &mut rec, "lookup", &["greeting", "greetings"], &[]).unwrap();
        assert_eq!(rec.get("greeting"), Some(Value::from("Alohaeha")));

        let err = run_with(
            &mut context,
            &mut rec,
            "put_filemap",
            &["greetings.csv"],
            &[("key_column", "first")],
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid column 'first' for map");

        for sep_char in ["§", ";;", ""] {
            let err = run_with(
                &mut context,
                &mut rec,
                "put_filemap",
                &["greetings.csv", "other"],
                &[("sep_char", sep_char)],
            )
            .unwrap_err();
            assert!(matches!(err, FixError::InvalidArgument { ref operation, .. } if operation == "put_filemap"));
        }
        assert!(!context.maps().contains("other"));
    }

    #[test]
    fn test_put_vars() {
        let mut context = FixContext::new();
        let mut rec = Record::new();
        run_with(&mut context, &mut rec, "put_var", &["a", "1"], &[]).unwrap();
        run_with(&mut context, &mut rec, "put_vars", &[], &[("b", "2")]).unwrap();
        assert_eq!(context.resolve_vars("$[a]$[b]"), "12");
    }
}
