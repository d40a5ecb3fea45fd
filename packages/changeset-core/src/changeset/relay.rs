use std::fmt;
use std::sync::Weak;

use serde_json::Value;

use crate::content::Content;
use crate::error::{ChangesetError, Result};
use crate::path;

use super::buffers::Changes;
use super::changeset::{Changeset, Inner};
use super::pending::WriteStatus;

/// Result of [`Changeset::get`].
pub enum Property<C: Content> {
    /// A plain value
    Value(Value),
    /// A nested mapping, viewed through a relay
    Relay(Relay<C>),
}

impl<C: Content> Property<C> {
    /// The plain value; relays are materialized.
    pub fn into_value(self) -> Value {
        match self {
            Property::Value(value) => value,
            Property::Relay(relay) => relay.value(),
        }
    }

    pub fn as_relay(&self) -> Option<&Relay<C>> {
        match self {
            Property::Relay(relay) => Some(relay),
            Property::Value(_) => None,
        }
    }

    pub fn is_relay(&self) -> bool {
        matches!(self, Property::Relay(_))
    }
}

impl<C: Content> fmt::Debug for Property<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Property::Relay(relay) => f.debug_tuple("Relay").field(relay).finish(),
        }
    }
}

/// A nested mapping of a changeset, addressed as if it were a changeset.
///
/// Reads and writes are forwarded to the owning changeset with the relay's
/// key as path prefix, so they share its buffers and validation. The relay
/// does not keep its changeset alive: once the changeset is dropped, reads
/// yield `null` and writes fail with `ChangesetError::Detached`.
pub struct Relay<C: Content> {
    key: String,
    owner: Weak<Inner<C>>,
}

impl<C: Content> Clone for Relay<C> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            owner: Weak::clone(&self.owner),
        }
    }
}

impl<C: Content> Relay<C> {
    pub(crate) fn new(key: &str, owner: Weak<Inner<C>>) -> Self {
        Self {
            key: key.to_string(),
            owner,
        }
    }

    /// Path prefix this relay stands for.
    pub fn key(&self) -> &str {
        &self.key
    }

    fn owner(&self) -> Option<Changeset<C>> {
        self.owner.upgrade().map(Changeset::from_inner)
    }

    /// Reads a key relative to this relay.
    pub fn get(&self, key: &str) -> Property<C> {
        match self.owner() {
            Some(changeset) => changeset.get(&path::join(&self.key, key)),
            None => Property::Value(Value::Null),
        }
    }

    /// Reads a key relative to this relay as a plain value.
    pub fn read(&self, key: &str) -> Value {
        self.get(key).into_value()
    }

    /// Writes a key relative to this relay through the owner's validation.
    pub fn write(&self, key: &str, value: Value) -> Result<WriteStatus> {
        let changeset = self.owner().ok_or_else(|| ChangesetError::Detached {
            key: self.key.clone(),
        })?;
        changeset.write(&path::join(&self.key, key), value)
    }

    /// The whole nested mapping with pending edits applied.
    pub fn value(&self) -> Value {
        self.owner()
            .map_or(Value::Null, |changeset| changeset.nested_value(&self.key))
    }

    /// Pending changes under this relay's key.
    pub fn changes(&self) -> Changes {
        self.owner()
            .map(|changeset| changeset.nested_changes(&self.key))
            .unwrap_or_default()
    }

    pub fn is_dirty(&self) -> bool {
        !self.changes().is_empty()
    }

    /// Returns `true` if nothing at or under this relay's key is in error.
    pub fn is_valid(&self) -> bool {
        self.owner()
            .map_or(true, |changeset| !changeset.has_errors_within(&self.key))
    }
}

impl<C: Content> fmt::Debug for Relay<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relay").field("key", &self.key).finish()
    }
}
