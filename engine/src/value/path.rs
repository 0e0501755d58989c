//! Dotted path resolution over hashes and arrays.
//!
//! A path such as `author.$last.name` is split on `.` into segments:
//!
//! | Segment              | In a Hash            | In an Array                     |
//! |----------------------|----------------------|---------------------------------|
//! | `name`, `a*`, `[ab]` | matching field(s)    | applied to every element        |
//! | `1`, `2`, ...        | field named so       | element at 1-based position     |
//! | `$first`, `$last`    | field named so       | first / last element            |
//! | `$append`            | field named so       | new slot at the end (write only)|
//! | `*`                  | every field          | every element                   |
//!
//! Reads never fail: anything that cannot be resolved is absent. Writes that
//! reference a position which does not exist raise a path resolution error.

use super::hash::ARRAY_MARKER;
use super::{Array, Hash, Value, ValueKind};
use crate::error::{FixError, FixResult};

/// Extend an array by one element.
pub const APPEND: &str = "$append";
/// First element of an array.
pub const FIRST: &str = "$first";
/// Last element of an array.
pub const LAST: &str = "$last";
/// Every element of an array.
pub const ALL: &str = "*";

/// How a write treats an existing leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    /// Overwrite the leaf.
    Replace,
    /// Merge with the leaf (repeated field semantics).
    Append,
}

/// A parsed dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixPath {
    segments: Vec<String>,
}

impl FixPath {
    pub fn new(path: &str) -> Self {
        Self {
            segments: path.split('.').map(str::to_string).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// First segment.
    pub fn head(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or("")
    }

    /// Everything after the first segment.
    pub fn tail(&self) -> &[String] {
        self.segments.get(1..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl std::fmt::Display for FixPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Meaning of a segment when applied to an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Append,
    First,
    Last,
    Index(usize),
    All,
    Field,
}

impl Segment {
    fn parse(segment: &str) -> Self {
        match segment {
            APPEND => Segment::Append,
            FIRST => Segment::First,
            LAST => Segment::Last,
            ALL => Segment::All,
            s if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                s.parse().map(Segment::Index).unwrap_or(Segment::Field)
            }
            _ => Segment::Field,
        }
    }

    /// 0-based position within a container of `len` elements.
    fn position(self, len: usize) -> Option<usize> {
        match self {
            Segment::First => (len > 0).then_some(0),
            Segment::Last => len.checked_sub(1),
            Segment::Index(n) => (n >= 1 && n <= len).then(|| n - 1),
            _ => None,
        }
    }

    fn is_reference(self) -> bool {
        matches!(self, Segment::First | Segment::Last | Segment::Index(_))
    }
}

fn unresolved(segment: &str, array: &Array) -> FixError {
    FixError::path_resolution(segment, array)
}

// =============================================================================
// Read
// =============================================================================

pub(crate) fn find_in_hash(hash: &Hash, segments: &[String]) -> Option<Value> {
    let (head, tail) = segments.split_first()?;
    if tail.is_empty() {
        return hash.get(head);
    }
    let fields = hash.matching_fields(head);
    match fields.as_slice() {
        [] => None,
        [field] => hash
            .get_field(field)
            .and_then(|value| find_in_value(value, tail)),
        _ => hash
            .get(head)
            .and_then(|group| find_in_value(&group, tail)),
    }
}

pub(crate) fn find_in_value(value: &Value, segments: &[String]) -> Option<Value> {
    if segments.is_empty() {
        return Some(value.clone());
    }
    match value {
        Value::Hash(hash) => find_in_hash(hash, segments),
        Value::Array(array) => find_in_array(array, segments),
        Value::String(_) => None,
    }
}

fn find_in_array(array: &Array, segments: &[String]) -> Option<Value> {
    let (head, tail) = segments.split_first()?;
    match Segment::parse(head) {
        Segment::Append => None,
        Segment::All if tail.is_empty() => Some(Value::Array(array.clone())),
        Segment::All => collect(array.iter().filter_map(|v| find_in_value(v, tail))),
        Segment::Field => collect(array.iter().filter_map(|v| match v {
            Value::String(_) => None,
            container => find_in_value(container, segments),
        })),
        reference => reference
            .position(array.len())
            .and_then(|index| array.get(index))
            .and_then(|v| find_in_value(v, tail)),
    }
}

fn collect(values: impl Iterator<Item = Value>) -> Option<Value> {
    let array: Array = values.collect();
    (!array.is_empty()).then_some(Value::Array(array))
}

pub(crate) fn array_in_hash_mut<'a>(hash: &'a mut Hash, segments: &[String]) -> Option<&'a mut Array> {
    let (head, tail) = segments.split_first()?;
    array_in_value_mut(hash.get_field_mut(head)?, tail)
}

fn array_in_value_mut<'a>(value: &'a mut Value, segments: &[String]) -> Option<&'a mut Array> {
    let Some((head, tail)) = segments.split_first() else {
        return match value {
            Value::Array(array) => Some(array),
            _ => None,
        };
    };
    match value {
        Value::Hash(hash) => array_in_hash_mut(hash, segments),
        Value::Array(array) => {
            let index = Segment::parse(head).position(array.len())?;
            array_in_value_mut(array.get_mut(index)?, tail)
        }
        Value::String(_) => None,
    }
}

// =============================================================================
// Write
// =============================================================================

pub(crate) fn insert_into_hash(
    hash: &mut Hash,
    segments: &[String],
    mode: InsertMode,
    value: Value,
) -> FixResult<()> {
    let Some((head, tail)) = segments.split_first() else {
        return Ok(());
    };

    if tail.is_empty() {
        match mode {
            InsertMode::Replace => hash.put(head.as_str(), value),
            InsertMode::Append => hash.append_field(head, value),
        }
        return Ok(());
    }

    let mut fields = hash.matching_fields(head);
    if fields.is_empty() {
        hash.put(head.as_str(), new_container(head, tail)?);
        fields.push(head.clone());
    }
    for field in fields {
        if let Some(child) = hash.get_field_mut(&field) {
            insert_into_value(child, tail, mode, value.clone())?;
        }
    }
    Ok(())
}

/// Container created for a missing intermediate field.
fn new_container(field: &str, tail: &[String]) -> FixResult<Value> {
    let next = tail.first().map(|s| (s, Segment::parse(s)));
    match next {
        Some((_, Segment::Append)) => Ok(Value::Array(Array::new())),
        Some((segment, reference)) if reference.is_reference() => {
            Err(unresolved(segment, &Array::new()))
        }
        _ if field.ends_with(ARRAY_MARKER) => Ok(Value::Array(Array::new())),
        _ => Ok(Value::Hash(Hash::new())),
    }
}

fn insert_into_value(
    target: &mut Value,
    segments: &[String],
    mode: InsertMode,
    value: Value,
) -> FixResult<()> {
    match target {
        Value::Hash(hash) => insert_into_hash(hash, segments, mode, value),
        Value::Array(array) => insert_into_array(array, segments, mode, value),
        Value::String(_) => Err(FixError::type_mismatch(ValueKind::Hash, ValueKind::String)),
    }
}

fn insert_into_array(
    array: &mut Array,
    segments: &[String],
    mode: InsertMode,
    value: Value,
) -> FixResult<()> {
    let Some((head, tail)) = segments.split_first() else {
        return Ok(());
    };
    let segment = Segment::parse(head);

    if tail.is_empty() {
        match segment {
            Segment::Append => array.add(value),
            Segment::All => {
                for element in array.iter_mut() {
                    *element = value.clone();
                }
            }
            Segment::Field => {
                let mut hash = Hash::new();
                hash.append_field(head, value);
                array.add(hash);
            }
            reference => {
                let Some(index) = reference.position(array.len()) else {
                    return Err(unresolved(head, array));
                };
                array.set(index, value);
            }
        }
        return Ok(());
    }

    match segment {
        Segment::Append => {
            let mut child = match Segment::parse(&tail[0]) {
                Segment::Append => Value::Array(Array::new()),
                _ => Value::Hash(Hash::new()),
            };
            insert_into_value(&mut child, tail, mode, value)?;
            array.add(child);
        }
        Segment::All => {
            for element in array.iter_mut().filter(|e| !e.is_string()) {
                insert_into_value(element, tail, mode, value.clone())?;
            }
        }
        Segment::Field => {
            let mut hash = Hash::new();
            insert_into_hash(&mut hash, segments, mode, value)?;
            array.add(hash);
        }
        reference => {
            let Some(index) = reference.position(array.len()) else {
                return Err(unresolved(head, array));
            };
            if let Some(element) = array.get_mut(index) {
                insert_into_value(element, tail, mode, value)?;
            }
        }
    }
    Ok(())
}

// =============================================================================
// Remove
// =============================================================================

pub(crate) fn remove_in_hash(hash: &mut Hash, segments: &[String]) {
    let Some((head, tail)) = segments.split_first() else {
        return;
    };
    if tail.is_empty() {
        hash.remove_field(head);
        return;
    }
    for field in hash.matching_fields(head) {
        if let Some(child) = hash.get_field_mut(&field) {
            remove_in_value(child, tail);
        }
    }
}

fn remove_in_value(target: &mut Value, segments: &[String]) {
    match target {
        Value::Hash(hash) => remove_in_hash(hash, segments),
        Value::Array(array) => remove_in_array(array, segments),
        Value::String(_) => {}
    }
}

fn remove_in_array(array: &mut Array, segments: &[String]) {
    let Some((head, tail)) = segments.split_first() else {
        return;
    };
    match Segment::parse(head) {
        Segment::Append => {}
        Segment::All if tail.is_empty() => array.clear(),
        Segment::All => {
            for element in array.iter_mut() {
                remove_in_value(element, tail);
            }
        }
        Segment::Field => {
            for element in array.iter_mut() {
                remove_in_value(element, segments);
            }
        }
        reference => {
            if let Some(index) = reference.position(array.len()) {
                if tail.is_empty() {
                    array.remove(index);
                } else if let Some(element) = array.get_mut(index) {
                    remove_in_value(element, tail);
                }
            }
        }
    }
}

// =============================================================================
// Transform
// =============================================================================

pub(crate) fn transform_in_hash<F>(hash: &mut Hash, segments: &[String], f: &mut F) -> FixResult<()>
where
    F: FnMut(&Value) -> FixResult<Option<Value>>,
{
    let Some((head, tail)) = segments.split_first() else {
        return Ok(());
    };
    for field in hash.matching_fields(head) {
        if tail.is_empty() {
            let replacement = match hash.get_field(&field) {
                Some(current) => f(current)?,
                None => continue,
            };
            match replacement {
                Some(value) => hash.put(field, value),
                None => {
                    hash.take_field(&field);
                }
            }
        } else if let Some(child) = hash.get_field_mut(&field) {
            transform_in_value(child, tail, f)?;
        }
    }
    Ok(())
}

fn transform_in_value<F>(target: &mut Value, segments: &[String], f: &mut F) -> FixResult<()>
where
    F: FnMut(&Value) -> FixResult<Option<Value>>,
{
    match target {
        Value::Hash(hash) => transform_in_hash(hash, segments, f),
        Value::Array(array) => transform_in_array(array, segments, f),
        Value::String(_) => Ok(()),
    }
}

fn transform_in_array<F>(array: &mut Array, segments: &[String], f: &mut F) -> FixResult<()>
where
    F: FnMut(&Value) -> FixResult<Option<Value>>,
{
    let Some((head, tail)) = segments.split_first() else {
        return Ok(());
    };
    match Segment::parse(head) {
        Segment::Append => {}
        Segment::All if tail.is_empty() => {
            let mut index = 0;
            while index < array.len() {
                if !transform_element(array, index, f)? {
                    continue;
                }
                index += 1;
            }
        }
        Segment::All => {
            for element in array.iter_mut() {
                transform_in_value(element, tail, f)?;
            }
        }
        Segment::Field => {
            for element in array.iter_mut() {
                transform_in_value(element, segments, f)?;
            }
        }
        reference => {
            if let Some(index) = reference.position(array.len()) {
                if tail.is_empty() {
                    transform_element(array, index, f)?;
                } else if let Some(element) = array.get_mut(index) {
                    transform_in_value(element, tail, f)?;
                }
            }
        }
    }
    Ok(())
}

/// Apply `f` to one element. Returns `false` if the element was removed.
fn transform_element<F>(array: &mut Array, index: usize, f: &mut F) -> FixResult<bool>
where
    F: FnMut(&Value) -> FixResult<Option<Value>>,
{
    let replacement = match array.get(index) {
        Some(current) => f(current)?,
        None => return Ok(false),
    };
    match replacement {
        Some(value) => {
            array.set(index, value);
            Ok(true)
        }
        None => {
            array.remove(index);
            Ok(false)
        }
    }
}

// =============================================================================
// Copy
// =============================================================================

/// Append each resolved value at `new_path`.
pub(crate) fn copy_values(target: &mut Hash, values: Option<Value>, new_path: &FixPath) -> FixResult<()> {
    let Some(values) = values else {
        return Ok(());
    };
    for value in values.into_list() {
        append_value(target, new_path.segments(), value)?;
    }
    Ok(())
}

fn append_value(hash: &mut Hash, segments: &[String], value: Value) -> FixResult<()> {
    match value {
        Value::String(_) => insert_into_hash(hash, segments, InsertMode::Append, value),
        Value::Hash(source) => match segments {
            [field] => {
                hash.append_field(field, Value::Hash(source));
                Ok(())
            }
            _ => match find_in_hash(&source, &segments[1..]) {
                Some(inner) => append_value(hash, segments, inner),
                None => Ok(()),
            },
        },
        // Nested arrays are not copied element-wise.
        Value::Array(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hash(json: serde_json::Value) -> Hash {
        Value::from_json(json).unwrap().into_hash().unwrap()
    }

    fn render(hash: &Hash) -> serde_json::Value {
        serde_json::Value::from(hash)
    }

    #[test]
    fn test_find_nested_and_positions() {
        let h = hash(json!({"author": [{"name": "max"}, {"name": "mo"}]}));
        assert_eq!(h.find("author.1.name"), Some(Value::from("max")));
        assert_eq!(h.find("author.$last.name"), Some(Value::from("mo")));
        assert_eq!(h.find("author.$first.name"), Some(Value::from("max")));
        assert_eq!(h.find("author.3.name"), None);
        assert_eq!(h.find("author.$append"), None);
    }

    #[test]
    fn test_find_literal_over_array() {
        let h = hash(json!({"your": [{"name": "max"}, {"name": "mo"}, "x"]}));
        let names = h.find("your.name").unwrap();
        assert_eq!(names, Value::from_json(json!(["max", "mo"])).unwrap());
        assert_eq!(h.find("your.*.name"), Some(names));
    }

    #[test]
    fn test_find_below_string_is_absent() {
        let h = hash(json!({"title": "marc"}));
        assert_eq!(h.find("title.sub"), None);
        assert!(!h.contains_path("title.sub"));
        assert!(h.contains_path("title"));
    }

    #[test]
    fn test_find_wildcard_field_then_nested() {
        let h = hash(json!({"a1": {"x": "1"}, "a2": {"x": "2"}, "b": {"x": "3"}}));
        assert_eq!(h.find("a*.x"), Value::from_json(json!(["1", "2"])));
    }

    #[test]
    fn test_append_marker() {
        let mut h = hash(json!({"animals[]": ["cat", "dog", "fox"]}));
        h.append_path("animals[].$append", "duck").unwrap();
        assert_eq!(render(&h), json!({"animals[]": ["cat", "dog", "fox", "duck"]}));
    }

    #[test]
    fn test_insert_creates_intermediates() {
        let mut h = Hash::new();
        h.append_path("a.b.c", "1").unwrap();
        h.append_path("list[].$append.name", "x").unwrap();
        h.append_path("tags.$append", "t").unwrap();
        assert_eq!(
            render(&h),
            json!({"a": {"b": {"c": "1"}}, "list[]": [{"name": "x"}], "tags": ["t"]})
        );
    }

    #[test]
    fn test_insert_reference_into_missing_fails() {
        let mut h = Hash::new();
        let err = h.set_path("animals.$first", "x").unwrap_err();
        assert!(matches!(err, FixError::PathResolution { .. }));
        assert_eq!(err.to_string(), "Using ref, but can't find: $first in: []");

        let mut h = hash(json!({"animals": ["cat"]}));
        assert!(h.set_path("animals.2", "x").is_err());
        h.set_path("animals.$last", "dog").unwrap();
        assert_eq!(render(&h), json!({"animals": ["dog"]}));
    }

    #[test]
    fn test_insert_below_string_fails() {
        let mut h = hash(json!({"title": "marc"}));
        let err = h.set_path("title.sub", "x").unwrap_err();
        assert_eq!(err.to_string(), "expected Hash, got String");
    }

    #[test]
    fn test_replace_vs_append() {
        let mut h = hash(json!({"title": "a"}));
        h.append_path("title", "b").unwrap();
        assert_eq!(render(&h), json!({"title": ["a", "b"]}));
        h.set_path("title", "c").unwrap();
        assert_eq!(render(&h), json!({"title": "c"}));
    }

    #[test]
    fn test_array_marker_field_starts_as_array() {
        let mut h = Hash::new();
        h.append_path("names[]", "max").unwrap();
        assert_eq!(render(&h), json!({"names[]": ["max"]}));
    }

    #[test]
    fn test_remove() {
        let mut h = hash(json!({"a": ["1", "2", "3"], "b": [{"x": "1", "y": "2"}], "c": "3"}));
        h.remove_path("a.2");
        h.remove_path("b.x");
        h.remove_path("c.nothing");
        assert_eq!(render(&h), json!({"a": ["1", "3"], "b": [{"y": "2"}], "c": "3"}));
        h.remove_path("a.*");
        assert_eq!(render(&h), json!({"a": [], "b": [{"y": "2"}], "c": "3"}));
    }

    #[test]
    fn test_transform_elements_and_removal() {
        let mut h = hash(json!({"title": ["a", "bb", "c"]}));
        h.transform("title.*", |v| {
            let s = v.as_string()?;
            Ok((s.len() == 1).then(|| Value::from(s.to_uppercase())))
        })
        .unwrap();
        assert_eq!(render(&h), json!({"title": ["A", "C"]}));
    }

    #[test]
    fn test_transform_array_leaf_requires_string() {
        let mut h = hash(json!({"title": ["a", "b"]}));
        let err = h
            .transform("title", |v| Ok(Some(Value::from(v.as_string()?.to_uppercase()))))
            .unwrap_err();
        assert_eq!(err.to_string(), "expected String, got Array");
    }

    #[test]
    fn test_copy_strings_and_hashes() {
        let mut h = hash(json!({"your": [{"name": "max"}, {"name": "mo"}]}));
        h.copy("your.name", "author.name[]").unwrap();
        h.copy("your", "people[]").unwrap();
        assert_eq!(
            render(&h),
            json!({
                "your": [{"name": "max"}, {"name": "mo"}],
                "author": {"name[]": ["max", "mo"]},
                "people[]": [{"name": "max"}, {"name": "mo"}]
            })
        );
    }

    #[test]
    fn test_copy_hashes_into_nested_target() {
        let mut h = hash(json!({"your": [{"name": "max"}, {"name": "mo"}, {"age": "3"}]}));
        h.copy("your", "x.name").unwrap();
        assert_eq!(
            render(&h),
            json!({
                "your": [{"name": "max"}, {"name": "mo"}, {"age": "3"}],
                "x": {"name": ["max", "mo"]}
            })
        );
    }

    #[test]
    fn test_copy_skips_nested_arrays() {
        let mut h = hash(json!({"nested": [["a", "b"], ["c"]]}));
        h.copy("nested", "flat").unwrap();
        assert_eq!(h.find("flat"), None);

        h.copy("nested.1", "flat").unwrap();
        assert_eq!(render(&h)["flat"], json!(["a", "b"]));
    }

    #[test]
    fn test_array_mut_follows_direct_paths_only() {
        let mut h = hash(json!({"work": [{"parts": ["x"]}], "author": [{"name": "max"}]}));
        assert_eq!(h.array_mut("work.$first.parts").map(|a| a.len()), Some(1));
        assert!(h.array_mut("work").is_some());
        assert!(h.array_mut("author.name").is_none());
        assert!(h.array_mut("work.*.parts").is_none());
        assert!(h.array_mut("w*").is_none());
        assert!(h.array_mut("work.2.parts").is_none());
    }

    #[test]
    fn test_copy_with_wildcard_merges() {
        let mut h = hash(json!({"animal": "dog"}));
        h.copy("?nimal", "animal").unwrap();
        assert_eq!(render(&h), json!({"animal": ["dog", "dog"]}));
    }

    #[test]
    fn test_path_display() {
        let path = FixPath::new("a.$first.b");
        assert_eq!(path.len(), 3);
        assert_eq!(path.head(), "a");
        assert_eq!(path.tail().len(), 2);
        assert_eq!(path.to_string(), "a.$first.b");
    }
}
