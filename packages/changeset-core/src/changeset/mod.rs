//! Changeset engine: buffered writes, validation, execute/save, merge and
//! snapshots.

mod buffers;
#[allow(clippy::module_inception)]
mod changeset;
mod events;
mod pending;
mod relay;

pub use buffers::{Changes, Errors, Snapshot};
pub use changeset::Changeset;
pub use events::ChangesetEvent;
pub use pending::{PendingWrite, WriteStatus};
pub use relay::{Property, Relay};
