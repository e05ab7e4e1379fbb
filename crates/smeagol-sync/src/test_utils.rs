//! Shared fixtures for the sync tests.

use smeagol_core::{BackendError, MemoryRepository, RepositoryBackend, RepositoryId};
use smeagol_index::{DocumentId, IndexedDocument, SearchEngine, SledSearchEngine};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::coordinator::SessionFactory;

/// A mutation observed by [`RecordingEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Store(String),
    Delete(String),
    DeleteAll,
}

/// Wraps a temporary sled engine and records every mutation.
pub struct RecordingEngine {
    inner: SledSearchEngine,
    ops: Mutex<Vec<Op>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self {
            inner: SledSearchEngine::temporary().unwrap(),
            ops: Mutex::new(Vec::new()),
        }
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    pub fn clear_ops(&self) {
        self.ops.lock().unwrap().clear();
    }

    /// Paths of all stored documents of a repository.
    pub fn paths(&self, repository: &str) -> Vec<String> {
        self.inner
            .documents(&RepositoryId::new(repository))
            .unwrap()
            .into_iter()
            .map(|d| d.path)
            .collect()
    }

    fn record(&self, op: Op) {
        self.ops.lock().unwrap().push(op);
    }
}

impl SearchEngine for RecordingEngine {
    fn store(&self, document: &IndexedDocument) -> smeagol_index::Result<()> {
        self.record(Op::Store(document.path.clone()));
        self.inner.store(document)
    }

    fn delete(&self, id: &DocumentId) -> smeagol_index::Result<()> {
        self.record(Op::Delete(id.path.clone()));
        self.inner.delete(id)
    }

    fn delete_all(&self, repository: &RepositoryId) -> smeagol_index::Result<usize> {
        self.record(Op::DeleteAll);
        self.inner.delete_all(repository)
    }

    fn get(&self, id: &DocumentId) -> smeagol_index::Result<Option<IndexedDocument>> {
        self.inner.get(id)
    }

    fn documents(&self, repository: &RepositoryId) -> smeagol_index::Result<Vec<IndexedDocument>> {
        self.inner.documents(repository)
    }

    fn flush(&self) -> smeagol_index::Result<()> {
        self.inner.flush()
    }
}

/// Hands out sessions for in-memory repositories.
#[derive(Default)]
pub struct MemorySessions {
    repositories: HashMap<RepositoryId, Arc<MemoryRepository>>,
}

impl MemorySessions {
    pub fn add(&mut self, repository: Arc<MemoryRepository>) {
        self.repositories
            .insert(repository.repository().clone(), repository);
    }
}

impl SessionFactory for MemorySessions {
    fn open(&self, repository: &RepositoryId) -> smeagol_core::Result<Box<dyn RepositoryBackend>> {
        match self.repositories.get(repository) {
            Some(repo) => Ok(Box::new(Arc::clone(repo))),
            None => Err(BackendError::not_found(repository.as_str(), "")),
        }
    }

    fn repositories(&self) -> smeagol_core::Result<Vec<RepositoryId>> {
        let mut ids: Vec<_> = self.repositories.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// A repository with a `docs` wiki at revision 23 on `main`.
pub fn wiki_repository(id: &str) -> MemoryRepository {
    let repo = MemoryRepository::new(id);
    repo.commit(
        "23",
        &[
            (".smeagol.yml", "directory: docs\n"),
            ("docs/old.md", "# Old"),
            ("docs/keep.md", "# Keep"),
            ("src/x.go", "package x"),
        ],
    );
    repo.set_branch("main", "23", true);
    repo
}
