use tokio::task::JoinHandle;

use crate::error::{ChangesetError, Result};
use crate::validation::ValidationResult;

/// What `write` did with a value.
#[derive(Debug)]
pub enum WriteStatus {
    /// Validated synchronously; buffers already reflect the verdict
    Settled(ValidationResult),
    /// Validation still running; buffers update when it completes
    Pending(PendingWrite),
}

impl WriteStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, WriteStatus::Pending(_))
    }

    /// Waits until the buffers reflect the verdict.
    pub async fn settled(self) -> Result<ValidationResult> {
        match self {
            WriteStatus::Settled(result) => Ok(result),
            WriteStatus::Pending(pending) => pending.settled().await,
        }
    }
}

/// Handle to a write whose validation runs on the tokio runtime.
///
/// Dropping the handle does not cancel the validation; the buffers are
/// still updated when it completes.
#[derive(Debug)]
pub struct PendingWrite {
    key: String,
    task: JoinHandle<Result<ValidationResult>>,
}

impl PendingWrite {
    pub(crate) fn new(key: &str, task: JoinHandle<Result<ValidationResult>>) -> Self {
        Self {
            key: key.to_string(),
            task,
        }
    }

    /// Key being validated.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns `true` once the buffers have been updated.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the verdict to land in the buffers.
    pub async fn settled(self) -> Result<ValidationResult> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Validation of {} did not complete: {}", self.key, e);
                Err(ChangesetError::ValidationTask {
                    key: self.key,
                    reason: e.to_string(),
                })
            }
        }
    }
}
