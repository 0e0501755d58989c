//! Built-in predicates for `if`, `elsif` and `unless`.

use std::str::FromStr;

use super::context::FixContext;
use super::expression::Options;
use super::function::{compile_regex, param, strings, FixPredicate};
use crate::error::{FixError, FixResult};
use crate::record::Record;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixConditional {
    Exists,

    AllContain,
    AnyContain,
    NoneContain,
    AllEqual,
    AnyEqual,
    NoneEqual,
    AllMatch,
    AnyMatch,
    NoneMatch,

    IsArray,
    IsHash,
    IsString,
    IsEmpty,
    IsNumber,
    IsTrue,
    IsFalse,
}

/// How many of the resolved strings must satisfy the test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quantifier {
    All,
    Any,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Contain,
    Equal,
    Match,
}

impl FixConditional {
    pub const ALL: &'static [FixConditional] = &[
        FixConditional::Exists,
        FixConditional::AllContain,
        FixConditional::AnyContain,
        FixConditional::NoneContain,
        FixConditional::AllEqual,
        FixConditional::AnyEqual,
        FixConditional::NoneEqual,
        FixConditional::AllMatch,
        FixConditional::AnyMatch,
        FixConditional::NoneMatch,
        FixConditional::IsArray,
        FixConditional::IsHash,
        FixConditional::IsString,
        FixConditional::IsEmpty,
        FixConditional::IsNumber,
        FixConditional::IsTrue,
        FixConditional::IsFalse,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FixConditional::Exists => "exists",
            FixConditional::AllContain => "all_contain",
            FixConditional::AnyContain => "any_contain",
            FixConditional::NoneContain => "none_contain",
            FixConditional::AllEqual => "all_equal",
            FixConditional::AnyEqual => "any_equal",
            FixConditional::NoneEqual => "none_equal",
            FixConditional::AllMatch => "all_match",
            FixConditional::AnyMatch => "any_match",
            FixConditional::NoneMatch => "none_match",
            FixConditional::IsArray => "is_array",
            FixConditional::IsHash => "is_hash",
            FixConditional::IsString => "is_string",
            FixConditional::IsEmpty => "is_empty",
            FixConditional::IsNumber => "is_number",
            FixConditional::IsTrue => "is_true",
            FixConditional::IsFalse => "is_false",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|conditional| conditional.name() == name)
    }

    fn comparison(self) -> Option<(Quantifier, Comparison)> {
        let pair = match self {
            FixConditional::AllContain => (Quantifier::All, Comparison::Contain),
            FixConditional::AnyContain => (Quantifier::Any, Comparison::Contain),
            FixConditional::NoneContain => (Quantifier::None, Comparison::Contain),
            FixConditional::AllEqual => (Quantifier::All, Comparison::Equal),
            FixConditional::AnyEqual => (Quantifier::Any, Comparison::Equal),
            FixConditional::NoneEqual => (Quantifier::None, Comparison::Equal),
            FixConditional::AllMatch => (Quantifier::All, Comparison::Match),
            FixConditional::AnyMatch => (Quantifier::Any, Comparison::Match),
            FixConditional::NoneMatch => (Quantifier::None, Comparison::Match),
            _ => return None,
        };
        Some(pair)
    }
}

impl FromStr for FixConditional {
    type Err = FixError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::from_name(name).ok_or_else(|| FixError::UnknownOperation(name.to_string()))
    }
}

impl std::fmt::Display for FixConditional {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FixPredicate for FixConditional {
    fn test(
        &self,
        _context: &FixContext,
        record: &Record,
        params: &[String],
        _options: &Options,
    ) -> FixResult<bool> {
        let name = self.name();
        let path = param(name, params, 0)?;
        let value = record.find(path);

        if let Some((quantifier, comparison)) = self.comparison() {
            let expected = param(name, params, 1)?;
            return compare(value, quantifier, comparison, expected);
        }

        Ok(match self {
            FixConditional::Exists => value.is_some(),
            FixConditional::IsArray => matches!(value, Some(Value::Array(_))),
            FixConditional::IsHash => matches!(value, Some(Value::Hash(_))),
            FixConditional::IsString => matches!(value, Some(Value::String(_))),
            FixConditional::IsEmpty => value.map_or(false, |v| v.is_empty()),
            FixConditional::IsNumber => matches!(
                value,
                Some(Value::String(s)) if s.trim().parse::<f64>().map_or(false, f64::is_finite)
            ),
            FixConditional::IsTrue => matches!(value, Some(Value::String(s)) if s == "true" || s == "1"),
            FixConditional::IsFalse => matches!(value, Some(Value::String(s)) if s == "false" || s == "0"),
            _ => false,
        })
    }
}

fn compare(
    value: Option<Value>,
    quantifier: Quantifier,
    comparison: Comparison,
    expected: &str,
) -> FixResult<bool> {
    let values = value.map(strings).unwrap_or_default();

    let test: Box<dyn Fn(&str) -> bool + '_> = match comparison {
        Comparison::Contain => Box::new(move |s: &str| s.contains(expected)),
        Comparison::Equal => Box::new(move |s: &str| s == expected),
        Comparison::Match => {
            let pattern = compile_regex(&format!("^(?:{})$", expected))?;
            Box::new(move |s: &str| pattern.is_match(s))
        }
    };

    Ok(match quantifier {
        Quantifier::All => !values.is_empty() && values.iter().all(|s| test(s)),
        Quantifier::Any => values.iter().any(|s| test(s)),
        Quantifier::None => !values.iter().any(|s| test(s)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> Record {
        let json = json!({
            "name": "Max Mustermann",
            "animals": ["cat", "dog", "catfish"],
            "author": {"name": "mo"},
            "count": "42",
            "flag": "true",
            "off": "0",
            "blank": ""
        });
        Record::from(Value::from_json(json).unwrap().into_hash().unwrap())
    }

    fn check(name: &str, params: &[&str]) -> bool {
        let predicate: FixConditional = name.parse().unwrap();
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        predicate
            .test(&FixContext::new(), &record(), &params, &Options::new())
            .unwrap()
    }

    #[test]
    fn test_exists() {
        assert!(check("exists", &["name"]));
        assert!(check("exists", &["author.name"]));
        assert!(!check("exists", &["author.age"]));
    }

    #[test]
    fn test_contain() {
        assert!(check("all_contain", &["author.name", "m"]));
        assert!(!check("all_contain", &["animals", "cat"]));
        assert!(check("any_contain", &["animals", "fish"]));
        assert!(check("none_contain", &["animals", "bird"]));
        assert!(!check("all_contain", &["missing", "x"]));
        assert!(check("none_contain", &["missing", "x"]));
    }

    #[test]
    fn test_equal() {
        assert!(check("any_equal", &["animals", "dog"]));
        assert!(!check("all_equal", &["animals", "dog"]));
        assert!(check("all_equal", &["author.name", "mo"]));
        assert!(check("none_equal", &["animals", "do"]));
    }

    #[test]
    fn test_match_is_full_string() {
        assert!(check("all_match", &["animals", "[a-z]+"]));
        assert!(check("any_match", &["animals", "cat.*"]));
        assert!(!check("any_match", &["animals", "at"]));
        assert!(check("none_match", &["name", "Max"]));
    }

    #[test]
    fn test_type_predicates() {
        assert!(check("is_array", &["animals"]));
        assert!(check("is_hash", &["author"]));
        assert!(check("is_string", &["name"]));
        assert!(!check("is_string", &["missing"]));
        assert!(check("is_empty", &["blank"]));
        assert!(!check("is_empty", &["name"]));
        assert!(check("is_number", &["count"]));
        assert!(!check("is_number", &["name"]));
        assert!(check("is_true", &["flag"]));
        assert!(check("is_false", &["off"]));
        assert!(!check("is_false", &["flag"]));
    }

    #[test]
    fn test_missing_parameter_and_unknown() {
        let params = vec!["animals".to_string()];
        let err = FixConditional::AnyEqual
            .test(&FixContext::new(), &record(), &params, &Options::new())
            .unwrap_err();
        assert!(matches!(err, FixError::MissingParameter { index: 1, .. }));
        assert!("is_blue".parse::<FixConditional>().is_err());
    }
}
