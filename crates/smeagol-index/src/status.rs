//! Index status persistence.
//!
//! One record per repository says which revision of which branch the
//! index reflects. The synchronizer compares it with the repository's
//! current head to decide between doing nothing, an incremental update
//! and a full rebuild.

use crate::document::DOCUMENT_VERSION;
use crate::error::{IndexError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use smeagol_core::{Branch, RepositoryId};
use tracing::{trace, warn};

/// The watermark of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatus {
    pub revision: String,
    pub branch: String,
    /// When the record was written. Diagnostic only.
    pub last_update: DateTime<Utc>,
    /// [`DOCUMENT_VERSION`] at the time of indexing.
    pub version: u32,
}

impl IndexStatus {
    /// Revision and branch of a repository without any indexable head.
    pub const EMPTY: &'static str = "__empty";

    /// Status for an index that reflects `branch` with the current schema.
    pub fn new(branch: &Branch) -> Self {
        Self {
            revision: branch.revision.clone(),
            branch: branch.name.clone(),
            last_update: Utc::now(),
            version: DOCUMENT_VERSION,
        }
    }

    /// Status of a repository that has no head to index.
    pub fn empty() -> Self {
        Self {
            revision: Self::EMPTY.to_string(),
            branch: Self::EMPTY.to_string(),
            last_update: Utc::now(),
            version: DOCUMENT_VERSION,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.revision == Self::EMPTY
    }
}

/// Durable map from repository id to [`IndexStatus`].
///
/// Every write replaces the whole record and is flushed before returning.
pub struct IndexStatusStore {
    tree: Tree,
}

impl IndexStatusStore {
    pub const STORE_NAME: &'static str = "smeagol-search-status";

    pub fn open(db: &Db) -> Result<Self> {
        let tree = db.open_tree(Self::STORE_NAME)?;
        Ok(Self { tree })
    }

    /// Opens a store on a throwaway database.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::open(&db)
    }

    /// The stored status, `None` if the repository was never indexed.
    ///
    /// A record that does not decode is reported as
    /// [`IndexError::UnreadableStatus`].
    pub fn get(&self, repository: &RepositoryId) -> Result<Option<IndexStatus>> {
        match self.tree.get(repository.as_str())? {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|source| {
                IndexError::UnreadableStatus {
                    repository: repository.clone(),
                    source,
                }
            }),
            None => Ok(None),
        }
    }

    /// Records that the index now reflects `branch`.
    pub fn update(&self, repository: &RepositoryId, branch: &Branch) -> Result<IndexStatus> {
        let status = IndexStatus::new(branch);
        self.put(repository, &status)?;
        Ok(status)
    }

    /// Records that the repository has nothing to index.
    pub fn empty(&self, repository: &RepositoryId) -> Result<IndexStatus> {
        let status = IndexStatus::empty();
        self.put(repository, &status)?;
        Ok(status)
    }

    /// Forgets the status of a repository; its next sync is a full rebuild.
    pub fn invalidate(&self, repository: &RepositoryId) -> Result<()> {
        trace!("invalidating index status of repository {}", repository);
        self.tree.remove(repository.as_str())?;
        self.tree.flush()?;
        Ok(())
    }

    pub fn put(&self, repository: &RepositoryId, status: &IndexStatus) -> Result<()> {
        trace!(
            "storing index status {}@{} (version {}) for repository {}",
            status.branch,
            status.revision,
            status.version,
            repository
        );
        let bytes = serde_json::to_vec(status)?;
        self.tree.insert(repository.as_str(), bytes)?;
        self.tree.flush()?;
        Ok(())
    }

    /// All readable statuses, ordered by repository id. Records that do not
    /// decode are skipped.
    pub fn list(&self) -> Result<Vec<(RepositoryId, IndexStatus)>> {
        let mut statuses = Vec::new();
        for item in self.tree.iter() {
            let (key, value) = item?;
            let repository = RepositoryId::new(String::from_utf8_lossy(&key).into_owned());
            match serde_json::from_slice(&value) {
                Ok(status) => statuses.push((repository, status)),
                Err(e) => warn!(
                    "skipping unreadable index status of repository {}: {}",
                    repository, e
                ),
            }
        }
        Ok(statuses)
    }
}
