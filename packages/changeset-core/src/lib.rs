//! Changesets over mutable JSON-shaped objects.
//!
//! A changeset buffers attempted field writes apart from the object it
//! wraps, validates them, and only applies them on execute or save.
//! Provides dot-path buffer utilities, validation verdicts, nested relays,
//! merge, and snapshot/restore.

pub mod changeset;
pub mod config;
pub mod content;
pub mod entries;
pub mod error;
pub mod object;
pub mod path;
pub mod validation;

pub use changeset::{Changeset, ChangesetEvent, Property, Relay, Snapshot, WriteStatus};
pub use config::ChangesetOptions;
pub use content::Content;
pub use error::{ChangesetError, Result};
pub use validation::{ValidationResult, Validator, ValidatorOutput};
