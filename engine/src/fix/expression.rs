//! Parsed fix expressions.
//!
//! A fix is an ordered list of [`Expression`]s handed over by a parser. The
//! tree is serde-friendly, so a fix can also be stored as JSON:
//!
//! ```json
//! [
//!   {"type": "call", "name": "upcase", "params": ["title"]},
//!   {"type": "do", "name": "list", "options": {"path": "author", "var": "a"},
//!    "elements": [{"type": "call", "name": "trim", "params": ["a.name"]}]},
//!   {"type": "if", "name": "exists", "params": ["isbn"],
//!    "elements": [...], "elsif": {...}, "else": [...]}
//! ]
//! ```
//!
//! Options may be written as an object or as a list of `[key, value]` pairs;
//! the pair form keeps duplicate keys for [`options_map`] to fold.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Resolved option map of one expression node.
pub type Options = IndexMap<String, String>;

/// One node of a fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    /// Function call.
    Call(Call),
    /// Bind/iteration block (`do list(...)`).
    Do(Do),
    /// Conditional with optional `elsif` and `else`.
    If(If),
    /// Negated conditional.
    Unless(Unless),
}

/// A function call such as `upcase("title")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_options")]
    pub options: Vec<(String, String)>,
}

/// A bind block; `list` iterates over an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Do {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_options")]
    pub options: Vec<(String, String)>,
    #[serde(default)]
    pub elements: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct If {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_options")]
    pub options: Vec<(String, String)>,
    #[serde(default)]
    pub elements: Vec<Expression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elsif: Option<ElsIf>,
    #[serde(default, rename = "else", skip_serializing_if = "Option::is_none")]
    pub else_elements: Option<Vec<Expression>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElsIf {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_options")]
    pub options: Vec<(String, String)>,
    #[serde(default)]
    pub elements: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unless {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_options")]
    pub options: Vec<(String, String)>,
    #[serde(default)]
    pub elements: Vec<Expression>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OptionsRepr {
    Pairs(Vec<(String, String)>),
    Object(IndexMap<String, String>),
}

fn deserialize_options<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OptionsRepr::deserialize(deserializer)? {
        OptionsRepr::Pairs(pairs) => pairs,
        OptionsRepr::Object(map) => map.into_iter().collect(),
    })
}

/// Fold an option list into a map.
///
/// A repeated key keeps the position of its first occurrence and the value
/// of its last.
pub fn options_map(options: &[(String, String)]) -> Options {
    let mut map = Options::new();
    for (key, value) in options {
        map.insert(key.clone(), value.clone());
    }
    map
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

// =============================================================================
// Builders
// =============================================================================

impl Call {
    pub fn new(name: &str, params: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            params: to_strings(params),
            options: Vec::new(),
        }
    }

    pub fn with_option(mut self, key: &str, value: &str) -> Self {
        self.options.push((key.to_string(), value.to_string()));
        self
    }
}

impl Do {
    pub fn new(name: &str, elements: Vec<Expression>) -> Self {
        Self {
            name: name.to_string(),
            params: Vec::new(),
            options: Vec::new(),
            elements,
        }
    }

    pub fn with_option(mut self, key: &str, value: &str) -> Self {
        self.options.push((key.to_string(), value.to_string()));
        self
    }
}

impl If {
    pub fn new(name: &str, params: &[&str], elements: Vec<Expression>) -> Self {
        Self {
            name: name.to_string(),
            params: to_strings(params),
            options: Vec::new(),
            elements,
            elsif: None,
            else_elements: None,
        }
    }

    pub fn with_elsif(mut self, name: &str, params: &[&str], elements: Vec<Expression>) -> Self {
        self.elsif = Some(ElsIf {
            name: name.to_string(),
            params: to_strings(params),
            options: Vec::new(),
            elements,
        });
        self
    }

    pub fn with_else(mut self, elements: Vec<Expression>) -> Self {
        self.else_elements = Some(elements);
        self
    }
}

impl Unless {
    pub fn new(name: &str, params: &[&str], elements: Vec<Expression>) -> Self {
        Self {
            name: name.to_string(),
            params: to_strings(params),
            options: Vec::new(),
            elements,
        }
    }
}

impl From<Call> for Expression {
    fn from(call: Call) -> Self {
        Expression::Call(call)
    }
}

impl From<Do> for Expression {
    fn from(bind: Do) -> Self {
        Expression::Do(bind)
    }
}

impl From<If> for Expression {
    fn from(conditional: If) -> Self {
        Expression::If(conditional)
    }
}

impl From<Unless> for Expression {
    fn from(conditional: Unless) -> Self {
        Expression::Unless(conditional)
    }
}

impl Expression {
    /// Shorthand for a function call node.
    pub fn call(name: &str, params: &[&str]) -> Self {
        Call::new(name, params).into()
    }

    pub fn name(&self) -> &str {
        match self {
            Expression::Call(node) => &node.name,
            Expression::Do(node) => &node.name,
            Expression::If(node) => &node.name,
            Expression::Unless(node) => &node.name,
        }
    }

    /// Visit this node and every nested node, depth first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expression)) {
        visit(self);
        let nested: Vec<&'a [Expression]> = match self {
            Expression::Call(_) => Vec::new(),
            Expression::Do(node) => vec![node.elements.as_slice()],
            Expression::Unless(node) => vec![node.elements.as_slice()],
            Expression::If(node) => {
                let mut lists = vec![node.elements.as_slice()];
                if let Some(elsif) = &node.elsif {
                    lists.push(elsif.elements.as_slice());
                }
                if let Some(elements) = &node.else_elements {
                    lists.push(elements.as_slice());
                }
                lists
            }
        };
        for list in nested {
            for expression in list {
                expression.walk(visit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_fix() {
        let json = r#"[
            {"type": "call", "name": "upcase", "params": ["title"]},
            {"type": "do", "name": "list", "options": {"path": "author", "var": "a"},
             "elements": [{"type": "call", "name": "trim", "params": ["a.name"]}]},
            {"type": "if", "name": "exists", "params": ["isbn"],
             "elements": [{"type": "call", "name": "nothing"}],
             "elsif": {"name": "exists", "params": ["issn"]},
             "else": [{"type": "call", "name": "reject"}]}
        ]"#;
        let fix: Vec<Expression> = serde_json::from_str(json).unwrap();
        assert_eq!(fix.len(), 3);
        assert_eq!(fix[0], Expression::call("upcase", &["title"]));

        match &fix[1] {
            Expression::Do(node) => {
                assert_eq!(options_map(&node.options).get("var").map(String::as_str), Some("a"));
                assert_eq!(node.elements.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
        match &fix[2] {
            Expression::If(node) => {
                assert_eq!(node.elsif.as_ref().map(|e| e.name.as_str()), Some("exists"));
                assert_eq!(node.else_elements.as_ref().map(Vec::len), Some(1));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_options_keep_first_position() {
        let json = r#"{"type": "call", "name": "lookup", "params": ["title"],
                       "options": [["a", "1"], ["b", "2"], ["a", "3"]]}"#;
        let expression: Expression = serde_json::from_str(json).unwrap();
        let Expression::Call(call) = expression else {
            panic!("expected call");
        };
        let options = options_map(&call.options);
        assert_eq!(options.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(options.get("a").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_walk_visits_nested() {
        let fix: Expression = If::new("exists", &["a"], vec![Expression::call("upcase", &["a"])])
            .with_elsif("exists", &["b"], vec![Expression::call("trim", &["b"])])
            .with_else(vec![Do::new("list", vec![Expression::call("reject", &[])]).into()])
            .into();
        let mut names = Vec::new();
        fix.walk(&mut |e| names.push(e.name().to_string()));
        assert_eq!(names, vec!["exists", "upcase", "trim", "list", "reject"]);
    }
}
