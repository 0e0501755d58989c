//! Glob-style field name patterns.
//!
//! Field lookups in a [`Hash`](super::Hash) accept glob patterns that are
//! translated to anchored regular expressions:
//!
//! | Glob      | Meaning                         |
//! |-----------|---------------------------------|
//! | `*`       | any run of characters           |
//! | `?`       | exactly one character           |
//! | `[ac]`    | one character of the class      |
//! | `a\|b`    | alternation                     |
//!
//! A name without any of these metacharacters is a literal and only matches
//! itself. An empty class such as `animals[]` is literal text.

use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;

/// A compiled field name pattern.
#[derive(Debug, Clone)]
pub enum FieldPattern {
    /// Exact field name.
    Literal(String),
    /// Translated glob.
    Glob(Regex),
}

impl FieldPattern {
    /// Compile a pattern, falling back to a literal when it has no wildcards.
    pub fn new(pattern: &str) -> Self {
        match glob_to_regex(pattern) {
            Some(source) => match Regex::new(&source) {
                Ok(regex) => FieldPattern::Glob(regex),
                Err(_) => FieldPattern::Literal(pattern.to_string()),
            },
            None => FieldPattern::Literal(pattern.to_string()),
        }
    }

    /// Check a field name against this pattern.
    pub fn matches(&self, field: &str) -> bool {
        match self {
            FieldPattern::Literal(name) => name == field,
            FieldPattern::Glob(regex) => regex.is_match(field),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, FieldPattern::Literal(_))
    }
}

/// Translate a glob into an anchored regex source.
///
/// Returns `None` when the pattern contains no wildcard metacharacters.
pub fn glob_to_regex(pattern: &str) -> Option<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut source = String::from("^(?:");
    let mut wildcard = false;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                source.push_str(".*");
                wildcard = true;
            }
            '?' => {
                source.push('.');
                wildcard = true;
            }
            '|' => {
                source.push('|');
                wildcard = true;
            }
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    source.push('[');
                    let mut j = i + 1;
                    if matches!(chars[j], '!' | '^') {
                        source.push('^');
                        j += 1;
                    }
                    for &c in &chars[j..end] {
                        if matches!(c, '\\' | '[' | '&' | '~') {
                            source.push('\\');
                        }
                        source.push(c);
                    }
                    source.push(']');
                    i = end;
                    wildcard = true;
                }
                None => source.push_str(r"\["),
            },
            c => source.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
        i += 1;
    }

    source.push_str(")$");
    wildcard.then_some(source)
}

/// Index of the `]` closing a non-empty class opened at `start`.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut first = start + 1;
    if matches!(chars.get(first), Some('!' | '^')) {
        first += 1;
    }
    match chars.get(first) {
        None | Some(']') => None,
        Some(_) => chars[first..]
            .iter()
            .position(|&c| c == ']')
            .map(|offset| first + offset),
    }
}

/// Memoized pattern compilation, owned by a single `Hash`.
///
/// Cloning yields an empty cache and all caches compare equal, so the cache
/// never takes part in value semantics.
#[derive(Default)]
pub struct PatternCache {
    patterns: RefCell<HashMap<String, FieldPattern>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the compiled form of `pattern`, compiling it on first use.
    pub fn get(&self, pattern: &str) -> FieldPattern {
        if let Some(compiled) = self.patterns.borrow().get(pattern) {
            return compiled.clone();
        }
        let compiled = FieldPattern::new(pattern);
        self.patterns
            .borrow_mut()
            .insert(pattern.to_string(), compiled.clone());
        compiled
    }

    /// Number of distinct patterns compiled so far.
    pub fn len(&self) -> usize {
        self.patterns.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for PatternCache {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl PartialEq for PatternCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl std::fmt::Debug for PatternCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PatternCache({})", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matching<'a>(pattern: &str, fields: &[&'a str]) -> Vec<&'a str> {
        let compiled = FieldPattern::new(pattern);
        fields.iter().copied().filter(|f| compiled.matches(f)).collect()
    }

    const ANIMALS: [&str; 4] = ["animal", "bnimal", "cnimal", "dnimol"];

    #[test]
    fn test_character_class() {
        assert_eq!(matching("[ac]nimal", &ANIMALS), vec!["animal", "cnimal"]);
    }

    #[test]
    fn test_star() {
        assert_eq!(matching("*nimal", &ANIMALS), vec!["animal", "bnimal", "cnimal"]);
        assert_eq!(matching("ani*", &ANIMALS), vec!["animal"]);
    }

    #[test]
    fn test_question_mark() {
        assert_eq!(matching("?nimal", &ANIMALS), vec!["animal", "bnimal", "cnimal"]);
    }

    #[test]
    fn test_alternation() {
        assert_eq!(matching("animal|dnimol", &ANIMALS), vec!["animal", "dnimol"]);
    }

    #[test]
    fn test_literal_matches_only_itself() {
        assert_eq!(matching("animal", &["animal", "animals", "xanimal"]), vec!["animal"]);
        assert!(FieldPattern::new("animal").is_literal());
    }

    #[test]
    fn test_empty_brackets_are_literal() {
        assert!(glob_to_regex("animals[]").is_none());
        assert_eq!(matching("animals[]", &["animals[]", "animals"]), vec!["animals[]"]);
    }

    #[test]
    fn test_regex_metacharacters_escaped() {
        assert!(glob_to_regex("$append").is_none());
        assert_eq!(matching("a.*", &["a.b", "ab"]), vec!["a.b"]);
        assert_eq!(matching("$f*", &["$first", "first"]), vec!["$first"]);
    }

    #[test]
    fn test_negated_class() {
        assert_eq!(matching("[!a]nimal", &ANIMALS), vec!["bnimal", "cnimal"]);
    }

    #[test]
    fn test_cache_memoizes() {
        let cache = PatternCache::new();
        assert!(cache.get("a*").matches("abc"));
        assert!(cache.get("a*").matches("ab"));
        assert!(!cache.get("b").matches("a"));
        assert_eq!(cache.len(), 2);
        assert!(cache.clone().is_empty());
    }
}
