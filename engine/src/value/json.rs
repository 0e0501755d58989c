//! Conversion between record values and `serde_json`.
//!
//! JSON scalars that are not strings (numbers, booleans) become their string
//! form. `null` is absent and is dropped wherever it appears.

use serde_json::{Map, Value as Json};

use super::{Array, Hash, Value};

impl Value {
    /// Build a value from JSON. Returns `None` for `null`.
    pub fn from_json(json: Json) -> Option<Value> {
        match json {
            Json::Null => None,
            Json::Bool(b) => Some(Value::String(b.to_string())),
            Json::Number(n) => Some(Value::String(n.to_string())),
            Json::String(s) => Some(Value::String(s)),
            Json::Array(items) => Some(Value::Array(
                items.into_iter().filter_map(Value::from_json).collect(),
            )),
            Json::Object(map) => Some(Value::Hash(Hash::from_json_map(map))),
        }
    }
}

impl Hash {
    pub fn from_json_map(map: Map<String, Json>) -> Hash {
        let mut hash = Hash::new();
        for (field, json) in map {
            if let Some(value) = Value::from_json(json) {
                hash.put(field, value);
            }
        }
        hash
    }
}

impl From<&Value> for Json {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(s) => Json::String(s.clone()),
            Value::Array(array) => Json::from(array),
            Value::Hash(hash) => Json::from(hash),
        }
    }
}

impl From<&Array> for Json {
    fn from(array: &Array) -> Self {
        Json::Array(array.iter().map(Json::from).collect())
    }
}

impl From<&Hash> for Json {
    fn from(hash: &Hash) -> Self {
        Json::Object(
            hash.iter()
                .map(|(field, value)| (field.clone(), Json::from(value)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_become_strings() {
        let value = Value::from_json(json!({"n": 1, "b": true, "s": "x", "z": null}));
        let hash = value.unwrap().into_hash().unwrap();
        assert_eq!(hash.get_field("n"), Some(&Value::from("1")));
        assert_eq!(hash.get_field("b"), Some(&Value::from("true")));
        assert!(hash.get_field("z").is_none());
        assert_eq!(hash.len(), 3);
    }

    #[test]
    fn test_null_dropped_from_arrays() {
        let value = Value::from_json(json!(["a", null, "b"])).unwrap();
        assert_eq!(value.into_list().len(), 2);
    }

    #[test]
    fn test_render_keeps_field_order() {
        let value = Value::from_json(json!({"b": "1", "a": ["x", {"c": "2"}]})).unwrap();
        assert_eq!(
            Json::from(&value).to_string(),
            r#"{"b":"1","a":["x",{"c":"2"}]}"#
        );
    }
}
