//! Resolves the head a repository's index should follow.

use crate::error::{Result, SyncError};
use smeagol_core::{Branch, RepositoryBackend};
use tracing::trace;

/// Finds the branch the backend marks as default.
pub struct HeadResolver<'a> {
    backend: &'a dyn RepositoryBackend,
}

impl<'a> HeadResolver<'a> {
    pub fn new(backend: &'a dyn RepositoryBackend) -> Self {
        Self { backend }
    }

    /// The default branch, or `None` for a repository without one.
    ///
    /// An empty repository and a repository whose branches carry no
    /// default marker are treated alike: there is nothing to index.
    pub fn resolve(&self) -> Result<Option<Branch>> {
        let repository = self.backend.repository();
        let branches = self.backend.branches()?;
        trace!(
            "repository {} has {} branches",
            repository,
            branches.len()
        );

        let mut defaults = branches.into_iter().filter(|b| b.default);
        let Some(head) = defaults.next() else {
            return Ok(None);
        };
        if let Some(other) = defaults.next() {
            return Err(SyncError::contract(
                repository,
                format!(
                    "branches {} and {} are both marked as default",
                    head.name, other.name
                ),
            ));
        }
        if head.revision.is_empty() {
            return Err(SyncError::contract(
                repository,
                format!("default branch {} has no revision", head.name),
            ));
        }
        Ok(Some(head))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smeagol_core::MemoryRepository;

    #[test]
    fn test_resolves_default_branch() {
        let repo = MemoryRepository::new("hog");
        repo.commit("42", &[("docs/a.md", "a")]);
        repo.set_branch("feature", "42", false);
        repo.set_branch("main", "42", true);

        let head = HeadResolver::new(&repo).resolve().unwrap().unwrap();
        assert_eq!(head, Branch::default_branch("main", "42"));
    }

    #[test]
    fn test_no_branches_means_no_head() {
        let repo = MemoryRepository::new("hog");
        assert!(HeadResolver::new(&repo).resolve().unwrap().is_none());
    }

    #[test]
    fn test_no_default_marker_means_no_head() {
        let repo = MemoryRepository::new("hog");
        repo.commit("42", &[("docs/a.md", "a")]);
        repo.set_branch("feature", "42", false);

        assert!(HeadResolver::new(&repo).resolve().unwrap().is_none());
    }

    #[test]
    fn test_branch_listing_failure_is_transient() {
        let repo = MemoryRepository::new("hog");
        repo.fail_branches(true);

        let err = HeadResolver::new(&repo).resolve().unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_default_branch_without_revision_violates_contract() {
        let repo = MemoryRepository::new("hog");
        repo.set_branch("main", "", true);

        let err = HeadResolver::new(&repo).resolve().unwrap_err();
        assert!(matches!(err, SyncError::Contract { .. }));
    }
}
