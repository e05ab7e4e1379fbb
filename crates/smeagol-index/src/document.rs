//! Indexed documents.
//!
//! A document is the content of one Markdown file at one revision, plus
//! enough metadata to link back to it. The permission token lets the
//! search layer filter hits by what the caller may read.

use serde::{Deserialize, Serialize};
use smeagol_core::{Branch, RepositoryId};

/// Schema version of [`IndexedDocument`].
///
/// Bump this whenever the stored structure changes; every repository whose
/// watermark carries another version is rebuilt from scratch.
pub const DOCUMENT_VERSION: u32 = 2;

/// Read permission required to see documents of `repository`.
pub fn pull_permission(repository: &RepositoryId) -> String {
    format!("repository:pull:{}", repository)
}

/// Identity of a document: one per repository and path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId {
    pub repository: RepositoryId,
    pub path: String,
}

impl DocumentId {
    pub fn new(repository: &RepositoryId, path: impl Into<String>) -> Self {
        Self {
            repository: repository.clone(),
            path: path.into(),
        }
    }

    /// Storage key: repository id, a NUL separator, then the path.
    pub(crate) fn key(&self) -> Vec<u8> {
        let mut key = scope_prefix(&self.repository);
        key.extend_from_slice(self.path.as_bytes());
        key
    }
}

/// Key prefix shared by all documents of a repository.
pub(crate) fn scope_prefix(repository: &RepositoryId) -> Vec<u8> {
    let mut prefix = repository.as_str().as_bytes().to_vec();
    prefix.push(0);
    prefix
}

/// A Markdown file as stored in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub repository_id: RepositoryId,
    pub path: String,
    pub branch: String,
    pub revision: String,
    /// Raw file content, the searchable part.
    pub content: String,
    pub permission: String,
}

impl IndexedDocument {
    pub fn new(
        repository: &RepositoryId,
        branch: &Branch,
        path: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            repository_id: repository.clone(),
            path: path.into(),
            branch: branch.name.clone(),
            revision: branch.revision.clone(),
            content: content.into(),
            permission: pull_permission(repository),
        }
    }

    pub fn id(&self) -> DocumentId {
        DocumentId::new(&self.repository_id, self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_carries_branch_and_permission() {
        let repository = RepositoryId::new("heart-of-gold");
        let branch = Branch::default_branch("main", "42");
        let document = IndexedDocument::new(&repository, &branch, "docs/a.md", "# A");

        assert_eq!(document.branch, "main");
        assert_eq!(document.revision, "42");
        assert_eq!(document.permission, "repository:pull:heart-of-gold");
        assert_eq!(document.id(), DocumentId::new(&repository, "docs/a.md"));
    }

    #[test]
    fn test_keys_of_one_repository_share_the_scope_prefix() {
        let repository = RepositoryId::new("heart");
        let other = RepositoryId::new("heart-of-gold");
        let key = DocumentId::new(&repository, "docs/a.md").key();

        assert!(key.starts_with(&scope_prefix(&repository)));
        assert!(!key.starts_with(&scope_prefix(&other)));
        assert!(!DocumentId::new(&other, "a.md")
            .key()
            .starts_with(&scope_prefix(&repository)));
    }
}
