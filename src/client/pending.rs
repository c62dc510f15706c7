//! Fire-and-forget writes

use crate::domain::{Document, ResourceResponse, Result, SamplesError};
use tokio::task::JoinHandle;

/// A document creation running in the background
///
/// Dropping it does not cancel the write; call [`PendingWrite::wait`] to
/// observe the outcome.
#[derive(Debug)]
pub struct PendingWrite {
    document_id: Option<String>,
    handle: JoinHandle<Result<ResourceResponse<Document>>>,
}

impl PendingWrite {
    pub(crate) fn new(
        document_id: Option<String>,
        handle: JoinHandle<Result<ResourceResponse<Document>>>,
    ) -> Self {
        Self {
            document_id,
            handle,
        }
    }

    /// Id of the submitted document, if it had one when submitted
    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    /// Whether the write has completed, successfully or not
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the write and returns its outcome
    ///
    /// # Errors
    ///
    /// Returns the store error of the write, or `SamplesError::Other` if the
    /// background task panicked.
    pub async fn wait(self) -> Result<ResourceResponse<Document>> {
        self.handle
            .await
            .map_err(|e| SamplesError::Other(format!("Background write task failed: {e}")))?
    }
}
