//! Entry point for sync requests.
//!
//! The coordinator opens a backend session per request, runs a
//! [`SyncWorker`] inside it and makes sure two syncs of the same
//! repository never overlap. Different repositories sync in parallel.

use crate::error::{Result, SyncError};
use crate::worker::{SyncOutcome, SyncWorker};
use serde::{Deserialize, Serialize};
use smeagol_core::{ConfigOptions, RepositoryBackend, RepositoryId};
use smeagol_index::{IndexStatusStore, SearchEngine};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Opens read sessions on repositories.
pub trait SessionFactory: Send + Sync {
    /// A backend for one repository, valid for the duration of one sync.
    fn open(&self, repository: &RepositoryId) -> smeagol_core::Result<Box<dyn RepositoryBackend>>;

    /// Every repository that should be indexed.
    fn repositories(&self) -> smeagol_core::Result<Vec<RepositoryId>>;
}

/// Tuning for the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Maximum number of repositories synced at once during catch-up.
    pub concurrency: usize,
    pub config: ConfigOptions,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            config: ConfigOptions::default(),
        }
    }
}

/// Why a sync was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// The process started; catch up with pushes that happened meanwhile.
    Startup,
    /// New commits arrived.
    PostReceive,
    /// Another branch became the default.
    DefaultBranchChanged,
    /// An explicit request to rebuild from scratch.
    Reindex,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Startup => "startup",
            Self::PostReceive => "post-receive",
            Self::DefaultBranchChanged => "default-branch-changed",
            Self::Reindex => "reindex",
        };
        f.write_str(name)
    }
}

/// Result of one sync request.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub repository: RepositoryId,
    pub outcome: SyncOutcome,
    pub duration: Duration,
}

#[derive(Clone, Copy)]
enum Action {
    EnsureUpToDate,
    Reindex,
}

/// Serializes and dispatches syncs over a shared engine and status store.
pub struct SyncCoordinator {
    sessions: Arc<dyn SessionFactory>,
    engine: Arc<dyn SearchEngine>,
    status: Arc<IndexStatusStore>,
    options: SyncOptions,
    locks: Mutex<HashMap<RepositoryId, Arc<Mutex<()>>>>,
}

impl SyncCoordinator {
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        engine: Arc<dyn SearchEngine>,
        status: Arc<IndexStatusStore>,
        options: SyncOptions,
    ) -> Self {
        Self {
            sessions,
            engine,
            status,
            options,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Brings the index of `repository` up to date with its default branch.
    pub fn ensure_up_to_date(&self, repository: &RepositoryId) -> Result<SyncReport> {
        self.run(repository, Action::EnsureUpToDate)
    }

    /// Rebuilds the index of `repository` from scratch.
    pub fn reindex(&self, repository: &RepositoryId) -> Result<SyncReport> {
        self.run(repository, Action::Reindex)
    }

    /// Maps a trigger onto the matching operation.
    pub fn handle(&self, trigger: Trigger, repository: &RepositoryId) -> Result<SyncReport> {
        debug!("received {} trigger for repository {}", trigger, repository);
        match trigger {
            Trigger::Reindex => self.reindex(repository),
            Trigger::Startup | Trigger::PostReceive | Trigger::DefaultBranchChanged => {
                self.ensure_up_to_date(repository)
            }
        }
    }

    /// Syncs every repository once, at most `concurrency` at a time.
    ///
    /// Duplicate ids are synced once. Results are ordered by repository.
    pub async fn catch_up<I>(self: &Arc<Self>, repositories: I) -> Vec<(RepositoryId, Result<SyncReport>)>
    where
        I: IntoIterator<Item = RepositoryId>,
    {
        let repositories: BTreeSet<RepositoryId> = repositories.into_iter().collect();
        info!("catching up with {} repositories", repositories.len());

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for repository in repositories {
            let coordinator = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(permit) => {
                        let id = repository.clone();
                        tokio::task::spawn_blocking(move || {
                            let _permit = permit;
                            coordinator.handle(Trigger::Startup, &id)
                        })
                        .await
                        .unwrap_or_else(|e| Err(SyncError::Task(e.to_string())))
                    }
                    Err(e) => Err(SyncError::Task(e.to_string())),
                };
                (repository, result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => error!("catch up task failed: {}", e),
            }
        }
        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }

    /// [`catch_up`](Self::catch_up) over every repository the session
    /// factory knows.
    pub async fn catch_up_all(self: &Arc<Self>) -> Result<Vec<(RepositoryId, Result<SyncReport>)>> {
        let repositories = self.sessions.repositories()?;
        Ok(self.catch_up(repositories).await)
    }

    fn lock(&self, repository: &RepositoryId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(repository.clone()).or_default())
    }

    /// Drops the lock entry of a repository once nobody holds or waits for it.
    fn release(&self, repository: &RepositoryId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(lock);
        if locks
            .get(repository)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(repository);
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn run(&self, repository: &RepositoryId, action: Action) -> Result<SyncReport> {
        let lock = self.lock(repository);
        let (result, duration) = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            debug!("start sync of repository {}", repository);
            let start = Instant::now();
            let result = self.sync(repository, action);
            (result, start.elapsed())
        };
        self.release(repository, lock);

        match result {
            Ok(outcome) => {
                debug!(
                    "sync of repository {} finished in {:?}: {}",
                    repository, duration, outcome
                );
                Ok(SyncReport {
                    repository: repository.clone(),
                    outcome,
                    duration,
                })
            }
            Err(e) if e.is_transient() => {
                error!("failed to sync repository {}: {}", repository, e);
                Ok(SyncReport {
                    repository: repository.clone(),
                    outcome: SyncOutcome::Aborted {
                        reason: e.to_string(),
                    },
                    duration,
                })
            }
            Err(e) => {
                error!("failed to sync repository {}: {}", repository, e);
                Err(e)
            }
        }
    }

    fn sync(&self, repository: &RepositoryId, action: Action) -> Result<SyncOutcome> {
        let backend = self.sessions.open(repository)?;
        let worker = SyncWorker::new(
            backend.as_ref(),
            self.engine.as_ref(),
            &self.status,
            &self.options.config,
        );
        match action {
            Action::EnsureUpToDate => worker.ensure_up_to_date(),
            Action::Reindex => worker.reindex(),
        }
    }
}
