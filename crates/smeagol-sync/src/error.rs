//! Error types for synchronization.
//!
//! Most failures are transient: the sync attempt is abandoned, the stored
//! watermark stays where it was and the next trigger retries. Contract
//! violations are the exception, since retrying cannot fix them.

use smeagol_core::{BackendError, RepositoryId};
use smeagol_index::IndexError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    /// The repository backend failed while branching, browsing or diffing.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Writing documents or the watermark failed.
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// The backend returned data that breaks its own contract.
    #[error("contract violation in repository {repository}: {message}")]
    Contract {
        repository: RepositoryId,
        message: String,
    },

    /// A sync task panicked or was cancelled.
    #[error("sync task failed: {0}")]
    Task(String),
}

impl SyncError {
    pub fn contract(repository: &RepositoryId, message: impl Into<String>) -> Self {
        Self::Contract {
            repository: repository.clone(),
            message: message.into(),
        }
    }

    /// Whether a later attempt from the same watermark may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Index(_))
    }
}
