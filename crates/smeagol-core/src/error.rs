//! Error types for repository backends.
//!
//! "Not found" is a normal outcome when browsing or reading files, so it
//! gets its own variant. Callers check for it with
//! [`BackendError::is_not_found`] and treat everything else as I/O failure.

use thiserror::Error;

/// Convenience type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Things that can go wrong when talking to a version-control backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The path or revision does not exist in the repository.
    #[error("'{path}' not found in revision {revision}")]
    NotFound { path: String, revision: String },

    /// Storage, network or object database failure.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The backend cannot perform this operation at all.
    #[error("operation not supported: {0}")]
    Unsupported(String),
}

impl BackendError {
    /// Creates a not-found error for a path at a revision.
    pub fn not_found(path: impl Into<String>, revision: impl Into<String>) -> Self {
        Self::NotFound {
            path: path.into(),
            revision: revision.into(),
        }
    }

    /// Wraps a lower-level error with a short description of what failed.
    pub fn io(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Io {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
