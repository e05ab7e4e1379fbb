//! Applies store and delete operations for one repository.

use crate::document::{DocumentId, IndexedDocument};
use crate::engine::SearchEngine;
use crate::error::{IndexError, Result};
use smeagol_core::{Branch, RepositoryBackend, RepositoryId};
use tracing::{debug, trace};

/// Writes documents of the repository behind `backend` into `engine`.
///
/// Holds no state between calls; every method either applies all of its
/// paths or returns the first error.
pub struct Indexer<'a> {
    engine: &'a dyn SearchEngine,
    backend: &'a dyn RepositoryBackend,
}

impl<'a> Indexer<'a> {
    pub fn new(engine: &'a dyn SearchEngine, backend: &'a dyn RepositoryBackend) -> Self {
        Self { engine, backend }
    }

    pub fn repository(&self) -> &RepositoryId {
        self.backend.repository()
    }

    /// Reads every path at the tip of `branch` and stores it, replacing
    /// earlier versions of the same documents.
    pub fn store<I, S>(&self, branch: &Branch, paths: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let repository = self.repository();
        let mut stored = 0;
        for path in paths {
            let path = path.as_ref();
            trace!("store {} of repository {} to index", path, repository);
            let content = self
                .backend
                .content(Some(&branch.revision), path)
                .map_err(|source| IndexError::Content {
                    path: path.to_string(),
                    revision: branch.revision.clone(),
                    source,
                })?;
            let document = IndexedDocument::new(repository, branch, path, content);
            self.engine.store(&document)?;
            stored += 1;
        }
        if stored > 0 {
            debug!("stored {} documents of repository {}", stored, repository);
        }
        Ok(stored)
    }

    /// Removes the documents at `paths`.
    pub fn delete<I, S>(&self, paths: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let repository = self.repository();
        let mut deleted = 0;
        for path in paths {
            let path = path.as_ref();
            trace!("delete {} of repository {} from index", path, repository);
            self.engine.delete(&DocumentId::new(repository, path))?;
            deleted += 1;
        }
        if deleted > 0 {
            debug!("deleted {} documents of repository {}", deleted, repository);
        }
        Ok(deleted)
    }

    /// Removes every document of the repository.
    pub fn delete_all(&self) -> Result<usize> {
        self.engine.delete_all(self.repository())
    }

    /// Makes everything written so far durable.
    pub fn flush(&self) -> Result<()> {
        self.engine.flush()
    }
}
