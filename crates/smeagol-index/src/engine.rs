//! The search engine seam.
//!
//! The synchronizer only needs upsert by id, delete by id and delete by
//! repository. Query parsing and ranking belong to whoever reads the
//! index; [`SledSearchEngine`] just keeps the documents durable.

use crate::document::{scope_prefix, DocumentId, IndexedDocument};
use crate::error::{IndexError, Result};
use sled::{Batch, Db, Tree};
use smeagol_core::RepositoryId;
use tracing::debug;

/// Storage primitives the indexer needs from a search engine.
///
/// Shared between concurrent syncs of different repositories, hence
/// `Send + Sync`.
pub trait SearchEngine: Send + Sync {
    /// Inserts `document`, replacing any document with the same id.
    fn store(&self, document: &IndexedDocument) -> Result<()>;

    /// Removes one document. Removing a missing document is not an error.
    fn delete(&self, id: &DocumentId) -> Result<()>;

    /// Removes every document of `repository`, returning how many were
    /// removed.
    fn delete_all(&self, repository: &RepositoryId) -> Result<usize>;

    fn get(&self, id: &DocumentId) -> Result<Option<IndexedDocument>>;

    /// All documents of `repository`, ordered by path.
    fn documents(&self, repository: &RepositoryId) -> Result<Vec<IndexedDocument>>;

    /// Makes all previous writes durable.
    fn flush(&self) -> Result<()>;
}

/// A [`SearchEngine`] backed by a sled tree.
pub struct SledSearchEngine {
    tree: Tree,
}

impl SledSearchEngine {
    pub const TREE: &'static str = "smeagol-documents";

    /// Opens the document tree inside an existing database.
    pub fn open(db: &Db) -> Result<Self> {
        let tree = db.open_tree(Self::TREE)?;
        Ok(Self { tree })
    }

    /// Opens an engine on a throwaway database.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::open(&db)
    }
}

impl SearchEngine for SledSearchEngine {
    fn store(&self, document: &IndexedDocument) -> Result<()> {
        let bytes = bincode::serialize(document)?;
        self.tree.insert(document.id().key(), bytes)?;
        Ok(())
    }

    fn delete(&self, id: &DocumentId) -> Result<()> {
        self.tree.remove(id.key())?;
        Ok(())
    }

    fn delete_all(&self, repository: &RepositoryId) -> Result<usize> {
        let mut batch = Batch::default();
        let mut removed = 0;
        for item in self.tree.scan_prefix(scope_prefix(repository)) {
            let (key, _value) = item?;
            batch.remove(key);
            removed += 1;
        }
        self.tree.apply_batch(batch)?;
        self.tree.flush()?;
        debug!("removed {} documents of repository {}", removed, repository);
        Ok(removed)
    }

    fn get(&self, id: &DocumentId) -> Result<Option<IndexedDocument>> {
        match self.tree.get(id.key())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn documents(&self, repository: &RepositoryId) -> Result<Vec<IndexedDocument>> {
        let mut documents = Vec::new();
        for item in self.tree.scan_prefix(scope_prefix(repository)) {
            let (_key, value) = item?;
            documents.push(decode(&value)?);
        }
        Ok(documents)
    }

    fn flush(&self) -> Result<()> {
        self.tree.flush()?;
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> Result<IndexedDocument> {
    bincode::deserialize(bytes).map_err(|e| IndexError::Corrupted(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use smeagol_core::Branch;
    use tempfile::tempdir;

    fn document(repository: &str, path: &str, content: &str) -> IndexedDocument {
        IndexedDocument::new(
            &RepositoryId::new(repository),
            &Branch::default_branch("main", "42"),
            path,
            content,
        )
    }

    #[test]
    fn test_store_replaces_document_with_same_id() {
        let engine = SledSearchEngine::temporary().unwrap();
        engine.store(&document("hog", "docs/a.md", "v1")).unwrap();
        engine.store(&document("hog", "docs/a.md", "v2")).unwrap();

        let documents = engine.documents(&RepositoryId::new("hog")).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].content, "v2");
    }

    #[test]
    fn test_delete_removes_single_document() {
        let engine = SledSearchEngine::temporary().unwrap();
        let a = document("hog", "docs/a.md", "a");
        engine.store(&a).unwrap();
        engine.store(&document("hog", "docs/b.md", "b")).unwrap();

        engine.delete(&a.id()).unwrap();
        // deleting twice is fine
        engine.delete(&a.id()).unwrap();

        assert!(engine.get(&a.id()).unwrap().is_none());
        assert_eq!(engine.documents(&RepositoryId::new("hog")).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_all_is_scoped_to_repository() {
        let engine = SledSearchEngine::temporary().unwrap();
        engine.store(&document("hog", "docs/a.md", "a")).unwrap();
        engine.store(&document("hog", "docs/b.md", "b")).unwrap();
        engine.store(&document("hog-2", "docs/a.md", "other")).unwrap();

        let removed = engine.delete_all(&RepositoryId::new("hog")).unwrap();

        assert_eq!(removed, 2);
        assert!(engine.documents(&RepositoryId::new("hog")).unwrap().is_empty());
        assert_eq!(engine.documents(&RepositoryId::new("hog-2")).unwrap().len(), 1);
    }

    #[test]
    fn test_documents_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let db = sled::open(dir.path()).unwrap();
            let engine = SledSearchEngine::open(&db).unwrap();
            engine.store(&document("hog", "docs/a.md", "a")).unwrap();
            engine.flush().unwrap();
        }

        let db = sled::open(dir.path()).unwrap();
        let engine = SledSearchEngine::open(&db).unwrap();
        let documents = engine.documents(&RepositoryId::new("hog")).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].path, "docs/a.md");
    }
}
