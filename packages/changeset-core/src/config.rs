//! Changeset configuration.

use serde::Deserialize;

/// Changeset options, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChangesetOptions {
    /// Accept every write without running the validator
    pub skip_validate: bool,
    /// Buffered events per subscriber before the oldest are dropped
    pub event_capacity: usize,
}

impl Default for ChangesetOptions {
    fn default() -> Self {
        Self {
            skip_validate: false,
            event_capacity: 256,
        }
    }
}
