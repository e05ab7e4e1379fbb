use smeagol_core::{BackendError, RepositoryId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Database error: {0}")]
    Sled(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("Status encoding error: {0}")]
    Json(#[from] serde_json::Error),
    /// A stored status record no longer decodes, e.g. one written by an
    /// older release.
    #[error("unreadable index status of repository {repository}: {source}")]
    UnreadableStatus {
        repository: RepositoryId,
        #[source]
        source: serde_json::Error,
    },
    #[error("Corrupted data: {0}")]
    Corrupted(String),
    /// Reading a document's content from the repository failed.
    #[error("failed to read '{path}' at revision {revision}: {source}")]
    Content {
        path: String,
        revision: String,
        #[source]
        source: BackendError,
    },
}
