//! Changeset error types.

use thiserror::Error;

/// Result type for changeset operations.
pub type Result<T> = std::result::Result<T, ChangesetError>;

/// Changeset operation errors.
///
/// Validation failures are never reported through this type; they are
/// recorded as data in the errors buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChangesetError {
    /// `prepare` callback returned something other than a mapping
    #[error("Callback to `changeset.prepare` must return an object")]
    PrepareNotMapping,

    /// Two changesets wrapping different content were merged
    #[error("Cannot merge with a changeset of different content")]
    ContentMismatch,

    /// Path deletion beyond the supported nesting depth
    #[error("Unsupported nesting depth: {depth} segments (at most 3 are supported)")]
    UnsupportedNestingDepth { depth: usize },

    /// A validator went pending outside of a tokio runtime
    #[error("No async runtime available to validate '{key}'")]
    NoAsyncRuntime { key: String },

    /// A spawned validation did not run to completion
    #[error("Validation of '{key}' did not complete: {reason}")]
    ValidationTask { key: String, reason: String },

    /// Content save was rejected
    #[error("Save failed: {0}")]
    SaveFailed(String),

    /// Relay used after its changeset was dropped
    #[error("Relay for '{key}' outlived its changeset")]
    Detached { key: String },
}
