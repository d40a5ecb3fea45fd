//! Dot-separated key paths into nested JSON mappings.
//!
//! A path such as `org.usa.ca` addresses `map["org"]["usa"]["ca"]`. Reads
//! through a missing or non-mapping intermediate level yield `None`; writes
//! create intermediate levels as needed.

use serde_json::{Map, Value};

use crate::error::{ChangesetError, Result};

/// Deepest path `delete` is able to prune.
pub const MAX_DELETE_DEPTH: usize = 3;

/// Returns the value at `path`, or `None` if any segment is absent.
pub fn get<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = map.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Returns `true` if a value is stored at `path`.
pub fn has(map: &Map<String, Value>, path: &str) -> bool {
    get(map, path).is_some()
}

/// Stores `value` at `path`, creating intermediate mappings.
///
/// An intermediate slot holding a non-mapping value is replaced by an empty
/// mapping. The leaf slot is replaced, never merged.
pub fn set(map: &mut Map<String, Value>, path: &str, value: Value) {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };

    let mut current = map;
    if let Some(parents) = parents {
        for segment in parents.split('.') {
            let slot = current
                .entry(segment)
                .or_insert_with(|| Value::Object(Map::new()));
            current = ensure_object(slot);
        }
    }
    current.insert(leaf.to_string(), value);
}

/// Removes the value at `path` and prunes parents left empty.
///
/// # Returns
/// The removed value, `None` if nothing was stored there, or
/// `ChangesetError::UnsupportedNestingDepth` for paths deeper than
/// [`MAX_DELETE_DEPTH`].
pub fn delete(map: &mut Map<String, Value>, path: &str) -> Result<Option<Value>> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.len() > MAX_DELETE_DEPTH {
        return Err(ChangesetError::UnsupportedNestingDepth {
            depth: segments.len(),
        });
    }
    Ok(remove_pruning(map, &segments))
}

/// Flattens nested mappings into `(path, leaf)` pairs in insertion order.
///
/// Empty mappings are reported as leaves.
pub fn leaves(map: &Map<String, Value>) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    collect_leaves(map, None, &mut out);
    out
}

/// Joins a prefix and a relative key.
pub fn join(prefix: &str, key: &str) -> String {
    format!("{prefix}.{key}")
}

/// Returns `true` if `path` equals `ancestor` or lies underneath it.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    match path.strip_prefix(ancestor) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

fn ensure_object(slot: &mut Value) -> &mut Map<String, Value> {
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => map,
        _ => unreachable!("slot holds an object"),
    }
}

fn remove_pruning(map: &mut Map<String, Value>, segments: &[&str]) -> Option<Value> {
    match segments {
        [] => None,
        [leaf] => map.shift_remove(*leaf),
        [head, rest @ ..] => {
            let child = map.get_mut(*head)?.as_object_mut()?;
            let removed = remove_pruning(child, rest)?;
            if child.is_empty() {
                map.shift_remove(*head);
            }
            Some(removed)
        }
    }
}

fn collect_leaves(map: &Map<String, Value>, prefix: Option<&str>, out: &mut Vec<(String, Value)>) {
    for (key, value) in map {
        let path = match prefix {
            Some(prefix) => join(prefix, key),
            None => key.clone(),
        };
        match value {
            Value::Object(child) if !child.is_empty() => collect_leaves(child, Some(&path), out),
            _ => out.push((path, value.clone())),
        }
    }
}
