//! The object a changeset wraps.

use std::future::Future;
use std::pin::Pin;

use serde_json::{Map, Value};

use crate::path;

/// Persistence in progress, as returned by [`Content::save`].
pub type SaveFuture = Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send + 'static>>;

/// A mapping-like object addressable by dotted path.
///
/// Only `execute` and `save` ever call `set`; everything else reads.
pub trait Content: Send + Sync + 'static {
    /// Returns the value at `path`, or `None` if unset.
    fn get(&self, path: &str) -> Option<Value>;

    /// Assigns `value` at `path`, creating intermediate levels.
    fn set(&mut self, path: &str, value: Value);

    /// Starts persisting the content, if it knows how to.
    ///
    /// The default has no save operation.
    fn save(&mut self, options: Option<Value>) -> Option<SaveFuture> {
        let _ = options;
        None
    }
}

impl Content for Map<String, Value> {
    fn get(&self, key: &str) -> Option<Value> {
        path::get(self, key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        path::set(self, key, value);
    }
}

/// A JSON document; a non-object document is replaced by an object on
/// first write.
impl Content for Value {
    fn get(&self, key: &str) -> Option<Value> {
        self.as_object().and_then(|map| path::get(map, key)).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        if let Value::Object(map) = self {
            path::set(map, key, value);
            return;
        }
        let mut map = Map::new();
        path::set(&mut map, key, value);
        *self = Value::Object(map);
    }
}
