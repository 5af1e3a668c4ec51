//! Conversion between typed objects and the JSON maps sent to and received from the API.
//!
//! Expansion only writes values that are set and non-zero. Flattening is lenient: values of an
//! unexpected JSON type are treated as unset.

use std::{collections::BTreeMap, str::FromStr};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::object::Object;

pub type JsonMap = Map<String, Value>;

pub trait Codec: Object {
    fn expand(&self) -> JsonMap;

    fn flatten(map: &JsonMap) -> Self;
}

/// Writes `value` under `key` unless it is unset or zero.
pub fn put_value<T: Default + PartialEq + Serialize>(map: &mut JsonMap, key: &str, value: &Option<T>) {
    if let Some(v) = value.as_ref().filter(|v| **v != T::default()) {
        if let Ok(json) = serde_json::to_value(v) {
            map.insert(key.to_string(), json);
        }
    }
}

pub fn put_vec<T: Serialize>(map: &mut JsonMap, key: &str, values: &[T]) {
    if !values.is_empty() {
        if let Ok(json) = serde_json::to_value(values) {
            map.insert(key.to_string(), json);
        }
    }
}

pub fn put_map<V: Serialize>(map: &mut JsonMap, key: &str, values: &BTreeMap<String, V>) {
    if !values.is_empty() {
        if let Ok(json) = serde_json::to_value(values) {
            map.insert(key.to_string(), json);
        }
    }
}

pub fn put_object<T: Codec>(map: &mut JsonMap, key: &str, value: &Option<T>) {
    if let Some(expanded) = value
        .as_ref()
        .filter(|v| !v.is_empty())
        .map(T::expand)
        .filter(|m| !m.is_empty())
    {
        map.insert(key.to_string(), Value::Object(expanded));
    }
}

pub fn put_object_slice<T: Codec>(map: &mut JsonMap, key: &str, values: &[T]) {
    if !values.is_empty() {
        let items = values.iter().map(|v| Value::Object(v.expand())).collect();
        map.insert(key.to_string(), Value::Array(items));
    }
}

pub fn flatten_string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

pub fn flatten_bool(value: Option<&Value>) -> Option<bool> {
    value.and_then(Value::as_bool)
}

/// Integers arrive as JSON numbers, or as decimal strings for 64 bit fields.
pub fn flatten_integer(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| {
            // Whole numbers only; `i64::MAX as f64` rounds up to 2^63, hence the exclusive bound
            let f = n.as_f64()?;
            (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
        }),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

pub fn flatten_string_array(value: Option<&Value>) -> Vec<String> {
    flatten_array(value, |v| flatten_string(Some(v)))
}

pub fn flatten_integer_array(value: Option<&Value>) -> Vec<i64> {
    flatten_array(value, |v| flatten_integer(Some(v)))
}

pub fn flatten_string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Parses an enum value; enums are expected to keep unknown values rather than fail.
pub fn flatten_enum<E: FromStr>(value: Option<&Value>) -> Option<E> {
    value.and_then(Value::as_str).and_then(|s| s.parse().ok())
}

/// A `{}` becomes the empty object, anything that is not a JSON object is unset.
pub fn flatten_object<T: Codec>(value: Option<&Value>) -> Option<T> {
    value.and_then(Value::as_object).map(|m| {
        if m.is_empty() {
            T::default()
        } else {
            T::flatten(m)
        }
    })
}

pub fn flatten_object_slice<T: Codec>(value: Option<&Value>) -> Vec<T> {
    flatten_array(value, |v| v.as_object().map(T::flatten))
}

fn flatten_array<T>(value: Option<&Value>, item: impl Fn(&Value) -> Option<T>) -> Vec<T> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(item).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Clone, Debug, Default, PartialEq, Serialize)]
    struct KeyId {
        key_id: Option<String>,
    }
    impl Object for KeyId {}
    impl Codec for KeyId {
        fn expand(&self) -> JsonMap {
            let mut m = JsonMap::new();
            put_value(&mut m, "keyId", &self.key_id);
            m
        }

        fn flatten(map: &JsonMap) -> Self {
            Self {
                key_id: flatten_string(map.get("keyId")),
            }
        }
    }

    #[test]
    fn expand_skips_zero_values() {
        let mut m = JsonMap::new();
        put_value(&mut m, "empty", &Some(String::new()));
        put_value::<bool>(&mut m, "unset", &None);
        put_value(&mut m, "falsy", &Some(false));
        put_value(&mut m, "count", &Some(3i64));
        put_vec::<String>(&mut m, "list", &[]);
        put_object(&mut m, "object", &Some(KeyId::default()));
        put_object(
            &mut m,
            "key",
            &Some(KeyId {
                key_id: Some("ab".to_string()),
            }),
        );
        assert_eq!(Value::Object(m), json!({"count": 3, "key": {"keyId": "ab"}}));
    }

    #[test]
    fn flatten_scalars() {
        let v = json!({"n": 5, "s": "17", "f": 2.0, "b": true, "list": ["a", 1, "b"]});
        assert_eq!(flatten_integer(v.get("n")), Some(5));
        assert_eq!(flatten_integer(v.get("s")), Some(17));
        assert_eq!(flatten_integer(v.get("f")), Some(2));
        assert_eq!(flatten_integer(v.get("b")), None);
        assert_eq!(flatten_integer(Some(&json!(2.5))), None);
        assert_eq!(flatten_integer(Some(&json!(1e300))), None);
        assert_eq!(flatten_integer(Some(&json!(-1e300))), None);
        assert_eq!(flatten_integer(Some(&json!(-4.0))), Some(-4));
        assert_eq!(flatten_bool(v.get("b")), Some(true));
        assert_eq!(flatten_string(v.get("missing")), None);
        assert_eq!(flatten_string_array(v.get("list")), vec!["a", "b"]);
    }

    #[test]
    fn flatten_objects() {
        let v = json!({"empty": {}, "full": {"keyId": "ab"}, "wrong": "x", "list": [{"keyId": "a"}, 3]});
        assert_eq!(flatten_object::<KeyId>(v.get("empty")), Some(KeyId::default()));
        assert_eq!(
            flatten_object::<KeyId>(v.get("full")),
            Some(KeyId {
                key_id: Some("ab".to_string())
            })
        );
        assert_eq!(flatten_object::<KeyId>(v.get("wrong")), None);
        assert_eq!(flatten_object::<KeyId>(v.get("missing")), None);
        assert_eq!(flatten_object_slice::<KeyId>(v.get("list")).len(), 1);
    }
}
