//! Plain-object helpers over JSON mappings.

use serde_json::{Map, Value};

/// Returns `true` if `value` is a mapping.
pub fn is_object(value: &Value) -> bool {
    value.is_object()
}

/// Returns `true` if `value` is a mapping with no entries.
pub fn is_empty_object(value: &Value) -> bool {
    value.as_object().is_some_and(Map::is_empty)
}

/// Shallow merge: entries of `source` overwrite those of `target` in a copy.
pub fn assign(target: &Map<String, Value>, source: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = target.clone();
    for (key, value) in source {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Copy of `map` without the given top-level keys.
pub fn without<K: AsRef<str>>(keys: &[K], map: &Map<String, Value>) -> Map<String, Value> {
    let mut rest = map.clone();
    rest.retain(|key, _| !keys.iter().any(|k| k.as_ref() == key));
    rest
}

/// Copy of `map` with only the given top-level keys.
pub fn pick<K: AsRef<str>>(keys: &[K], map: &Map<String, Value>) -> Map<String, Value> {
    let mut picked = map.clone();
    picked.retain(|key, _| keys.iter().any(|k| k.as_ref() == key));
    picked
}

/// Recursively merges `source` into `target`.
///
/// Mappings are merged key by key; any other value replaces what is in
/// `target`.
pub fn merge_deep(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(key) {
                    Some(existing) => merge_deep(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, source) => *target = source.clone(),
    }
}
