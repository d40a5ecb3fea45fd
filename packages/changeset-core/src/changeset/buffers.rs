use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::path;
use crate::validation::ErrorRecord;

/// Pending changes, nested by path segment.
pub type Changes = Map<String, Value>;

/// Error records keyed by their exact dotted path.
pub type Errors = IndexMap<String, ErrorRecord>;

/// Point-in-time copy of a changeset's buffers.
///
/// `written` lists the paths whose values were written as a whole. When it
/// is empty (for instance in a hand-built snapshot), every leaf of
/// `changes` counts as written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub changes: Changes,
    pub errors: Errors,
    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    pub written: IndexSet<String>,
}

/// Holds the attempted edits of a changeset.
///
/// Edits are isolated from the content until execute. A path is staged
/// either as a change or as an error, never both.
#[derive(Debug, Clone, Default)]
pub(crate) struct Buffers {
    /// Accepted edits not yet applied to content
    pub changes: Changes,
    /// Rejected edits and their validations
    pub errors: Errors,
    /// Paths written as a unit; the mappings above them in `changes` are
    /// only scaffolding. No entry lies underneath another.
    pub written: IndexSet<String>,
}

impl Buffers {
    /// Stages an accepted value, clearing any error at the same path.
    ///
    /// A write underneath an already written path edits that value in
    /// place; any other write replaces whatever was written at or below
    /// `key`.
    pub fn stage_change(&mut self, key: &str, value: Value) {
        self.errors.shift_remove(key);
        path::set(&mut self.changes, key, value);

        if self.written_ancestor(key).is_none() {
            self.written.retain(|written| !path::is_within(written, key));
            self.written.insert(key.to_string());
        }
    }

    /// Drops the pending change at `key`, if there is one.
    pub fn unstage_change(&mut self, key: &str) -> Result<Option<Value>> {
        if !path::has(&self.changes, key) {
            return Ok(None);
        }
        let removed = path::delete(&mut self.changes, key)?;

        let changes = &self.changes;
        self.written
            .retain(|written| !path::is_within(written, key) && path::has(changes, written));
        Ok(removed)
    }

    /// Stages an error, evicting any pending change at the same path.
    pub fn stage_error(&mut self, key: &str, record: ErrorRecord) -> Result<()> {
        self.unstage_change(key)?;
        self.errors.insert(key.to_string(), record);
        Ok(())
    }

    /// The written path at or above `key`, if any.
    pub fn written_ancestor(&self, key: &str) -> Option<&str> {
        self.written
            .iter()
            .find(|written| path::is_within(key, written))
            .map(String::as_str)
    }

    /// Written paths with their pending values, in write order.
    pub fn written_changes(&self) -> Vec<(String, Value)> {
        self.written
            .iter()
            .filter_map(|key| {
                path::get(&self.changes, key).map(|value| (key.clone(), value.clone()))
            })
            .collect()
    }

    /// Replaces the changes wholesale; every leaf becomes a written path.
    pub fn replace_changes(&mut self, changes: Changes) {
        self.written = leaf_paths(&changes);
        self.changes = changes;
    }

    /// Keeps only the written paths that still hold a change.
    pub fn retain_written<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        let changes = &self.changes;
        self.written
            .retain(|written| keep(written) && path::has(changes, written));
    }

    /// Paths that currently hold a change or an error.
    pub fn touched_keys(&self) -> IndexSet<String> {
        self.written
            .iter()
            .chain(self.errors.keys())
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.changes.clear();
        self.errors.clear();
        self.written.clear();
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            changes: self.changes.clone(),
            errors: self.errors.clone(),
            written: self.written.clone(),
        }
    }
}

impl From<Snapshot> for Buffers {
    fn from(snapshot: Snapshot) -> Self {
        let written = if snapshot.written.is_empty() {
            leaf_paths(&snapshot.changes)
        } else {
            snapshot.written
        };
        Self {
            changes: snapshot.changes,
            errors: snapshot.errors,
            written,
        }
    }
}

fn leaf_paths(changes: &Changes) -> IndexSet<String> {
    path::leaves(changes).into_iter().map(|(key, _)| key).collect()
}
