//! The synchronization state machine.
//!
//! Given the stored watermark and the current head, the worker decides
//! whether the index of one repository is up to date, needs an
//! incremental update, needs a full rebuild or must be emptied, and then
//! carries that out. A watermark is only written after every document
//! change it covers has been applied and flushed.

use crate::collector::{PathCollector, RevisionRange};
use crate::diff::DiffCollector;
use crate::error::{Result, SyncError};
use crate::full_scan::FullScanCollector;
use crate::head::HeadResolver;
use smeagol_core::{Branch, ConfigOptions, RepositoryBackend, RepositoryId};
use smeagol_index::{IndexError, IndexStatusStore, Indexer, SearchEngine, DOCUMENT_VERSION};
use std::fmt;
use tracing::{debug, warn};

/// Why a repository is rebuilt from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReindexReason {
    /// The repository was never indexed.
    NoStatus,
    /// The index was built with another document schema.
    SchemaChanged { indexed: u32, current: u32 },
    /// The repository had no head the last time it was synced.
    EmptyStatus,
    /// The default branch is another one than the indexed branch.
    BranchChanged { from: String, to: String },
    /// `.smeagol.yml` changed since the indexed revision.
    ConfigurationChanged,
    /// The indexed revision is gone, e.g. after a force push.
    RevisionMissing { revision: String },
    /// Someone asked for it.
    Requested,
}

impl fmt::Display for ReindexReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoStatus => write!(f, "no index status"),
            Self::SchemaChanged { indexed, current } => {
                write!(f, "index version {} but {} is required", indexed, current)
            }
            Self::EmptyStatus => write!(f, "index was empty"),
            Self::BranchChanged { from, to } => {
                write!(f, "default branch changed from {} to {}", from, to)
            }
            Self::ConfigurationChanged => write!(f, "configuration changed"),
            Self::RevisionMissing { revision } => {
                write!(f, "indexed revision {} no longer exists", revision)
            }
            Self::Requested => write!(f, "reindex requested"),
        }
    }
}

/// What a sync did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The index already reflected the head.
    UpToDate { revision: String },
    /// Only the documents touched since the watermark were applied.
    Updated {
        revision: String,
        stored: usize,
        deleted: usize,
    },
    /// The index was purged and rebuilt from the head.
    Reindexed {
        revision: String,
        reason: ReindexReason,
        stored: usize,
    },
    /// The repository has no head; its index is now empty.
    Emptied,
    /// The attempt failed and the watermark was left untouched.
    Aborted { reason: String },
}

impl SyncOutcome {
    /// Whether the index was mutated.
    pub fn changed_index(&self) -> bool {
        !matches!(self, Self::UpToDate { .. } | Self::Aborted { .. })
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpToDate { revision } => write!(f, "up to date at {}", revision),
            Self::Updated {
                revision,
                stored,
                deleted,
            } => write!(
                f,
                "updated to {} ({} stored, {} deleted)",
                revision, stored, deleted
            ),
            Self::Reindexed {
                revision,
                reason,
                stored,
            } => write!(
                f,
                "reindexed at {} ({} stored, {})",
                revision, stored, reason
            ),
            Self::Emptied => write!(f, "emptied"),
            Self::Aborted { reason } => write!(f, "aborted: {}", reason),
        }
    }
}

/// Synchronizes the index of the repository behind one backend session.
pub struct SyncWorker<'a> {
    status: &'a IndexStatusStore,
    indexer: Indexer<'a>,
    head: HeadResolver<'a>,
    full_scan: FullScanCollector<'a>,
    diff: DiffCollector<'a>,
}

impl<'a> SyncWorker<'a> {
    pub fn new(
        backend: &'a dyn RepositoryBackend,
        engine: &'a dyn SearchEngine,
        status: &'a IndexStatusStore,
        options: &'a ConfigOptions,
    ) -> Self {
        Self {
            status,
            indexer: Indexer::new(engine, backend),
            head: HeadResolver::new(backend),
            full_scan: FullScanCollector::new(backend, options),
            diff: DiffCollector::new(backend, options),
        }
    }

    fn repository(&self) -> &RepositoryId {
        self.indexer.repository()
    }

    /// Brings the index up to date with the default branch, doing as
    /// little as the stored watermark allows.
    pub fn ensure_up_to_date(&self) -> Result<SyncOutcome> {
        let repository = self.repository();
        let status = match self.status.get(repository) {
            Ok(status) => status,
            Err(IndexError::UnreadableStatus { source, .. }) => {
                warn!(
                    "ignoring unreadable index status of repository {}: {}",
                    repository, source
                );
                None
            }
            Err(e) => return Err(e.into()),
        };

        let Some(head) = self.head.resolve()? else {
            warn!("no default branch found for repository {}", repository);
            return self.empty_repository();
        };

        let Some(status) = status else {
            debug!(
                "no index status present for repository {}, trigger reindex",
                repository
            );
            return self.reindex_for(ReindexReason::NoStatus);
        };

        if status.version != DOCUMENT_VERSION {
            debug!(
                "found index of repository {} in version {} required is {}, trigger reindex",
                repository, status.version, DOCUMENT_VERSION
            );
            self.reindex_for(ReindexReason::SchemaChanged {
                indexed: status.version,
                current: DOCUMENT_VERSION,
            })
        } else if status.is_empty() {
            debug!(
                "index of repository {} was empty, trigger reindex",
                repository
            );
            self.reindex_for(ReindexReason::EmptyStatus)
        } else if status.branch != head.name {
            debug!(
                "default branch changed from {} to {} in repository {}, trigger reindex",
                status.branch, head.name, repository
            );
            self.reindex_for(ReindexReason::BranchChanged {
                from: status.branch,
                to: head.name,
            })
        } else if status.revision == head.revision {
            debug!("index of repository {} is up to date", repository);
            Ok(SyncOutcome::UpToDate {
                revision: head.revision,
            })
        } else {
            self.update(&status.revision, &head)
        }
    }

    /// Purges the index of the repository and rebuilds it from the head.
    pub fn reindex(&self) -> Result<SyncOutcome> {
        self.reindex_for(ReindexReason::Requested)
    }

    fn update(&self, from: &str, head: &Branch) -> Result<SyncOutcome> {
        let repository = self.repository();
        debug!(
            "start updating index of repository {} from {} to {}",
            repository, from, head
        );

        let paths = match self
            .diff
            .collect(&RevisionRange::new(from, head.revision.as_str()))
        {
            Ok(paths) => paths,
            Err(SyncError::Backend(e)) if e.is_not_found() => {
                debug!(
                    "indexed revision {} of repository {} no longer exists, trigger reindex",
                    from, repository
                );
                return self.reindex_for(ReindexReason::RevisionMissing {
                    revision: from.to_string(),
                });
            }
            Err(e) => return Err(e),
        };
        if paths.configuration_changed {
            debug!(
                "smeagol configuration of repository {} changed, trigger reindex",
                repository
            );
            return self.reindex_for(ReindexReason::ConfigurationChanged);
        }

        let deleted = self.indexer.delete(&paths.to_delete)?;
        let stored = self.indexer.store(head, &paths.to_store)?;
        self.commit(head)?;

        Ok(SyncOutcome::Updated {
            revision: head.revision.clone(),
            stored,
            deleted,
        })
    }

    fn reindex_for(&self, reason: ReindexReason) -> Result<SyncOutcome> {
        let repository = self.repository();
        debug!("start re indexing for repository {} ({})", repository, reason);

        // From here on the old watermark no longer describes the index.
        self.status.invalidate(repository)?;
        self.indexer.delete_all()?;

        let Some(head) = self.head.resolve()? else {
            warn!("no default branch found for repository {}", repository);
            self.status.empty(repository)?;
            return Ok(SyncOutcome::Emptied);
        };

        let paths = self.full_scan.collect(head.revision.as_str())?;
        let stored = self.indexer.store(&head, &paths.to_store)?;
        self.commit(&head)?;

        Ok(SyncOutcome::Reindexed {
            revision: head.revision,
            reason,
            stored,
        })
    }

    fn empty_repository(&self) -> Result<SyncOutcome> {
        let repository = self.repository();
        debug!(
            "repository {} looks empty, delete all to clean up",
            repository
        );
        self.indexer.delete_all()?;
        self.status.empty(repository)?;
        Ok(SyncOutcome::Emptied)
    }

    fn commit(&self, head: &Branch) -> Result<()> {
        self.indexer.flush()?;
        self.status.update(self.repository(), head)?;
        Ok(())
    }
}
