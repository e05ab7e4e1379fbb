//! The version-control backend abstraction.
//!
//! A backend is a session bound to exactly one repository. Smeagol never
//! writes through it; it only lists branches, browses trees, reads file
//! content and diffs revisions.

use crate::error::Result;
use crate::repository::{Branch, FileObject, Modifications, RepositoryId};

/// Read access to one repository.
///
/// Implementations must report missing paths and revisions as
/// [`BackendError::NotFound`](crate::BackendError::NotFound) so callers can
/// tell "absent" apart from a broken backend.
pub trait RepositoryBackend {
    /// The repository this session is bound to.
    fn repository(&self) -> &RepositoryId;

    /// Lists all branches. An empty repository has none.
    fn branches(&self) -> Result<Vec<Branch>>;

    /// Returns the tree rooted at `path` in `revision`, fully expanded.
    ///
    /// An empty `path` means the repository root. If `path` names a file
    /// the result is a single file node.
    fn browse(&self, revision: &str, path: &str) -> Result<FileObject>;

    /// Reads a file as text. `None` reads from the backend's default
    /// revision (the tip of the default branch).
    fn content(&self, revision: Option<&str>, path: &str) -> Result<String>;

    /// Computes the structural changes from `from` to `to`.
    fn modifications(&self, from: &str, to: &str) -> Result<Modifications>;
}

impl<B: RepositoryBackend + ?Sized> RepositoryBackend for &B {
    fn repository(&self) -> &RepositoryId {
        (**self).repository()
    }

    fn branches(&self) -> Result<Vec<Branch>> {
        (**self).branches()
    }

    fn browse(&self, revision: &str, path: &str) -> Result<FileObject> {
        (**self).browse(revision, path)
    }

    fn content(&self, revision: Option<&str>, path: &str) -> Result<String> {
        (**self).content(revision, path)
    }

    fn modifications(&self, from: &str, to: &str) -> Result<Modifications> {
        (**self).modifications(from, to)
    }
}

impl<B: RepositoryBackend + ?Sized> RepositoryBackend for Box<B> {
    fn repository(&self) -> &RepositoryId {
        (**self).repository()
    }

    fn branches(&self) -> Result<Vec<Branch>> {
        (**self).branches()
    }

    fn browse(&self, revision: &str, path: &str) -> Result<FileObject> {
        (**self).browse(revision, path)
    }

    fn content(&self, revision: Option<&str>, path: &str) -> Result<String> {
        (**self).content(revision, path)
    }

    fn modifications(&self, from: &str, to: &str) -> Result<Modifications> {
        (**self).modifications(from, to)
    }
}

impl<B: RepositoryBackend + ?Sized> RepositoryBackend for std::sync::Arc<B> {
    fn repository(&self) -> &RepositoryId {
        (**self).repository()
    }

    fn branches(&self) -> Result<Vec<Branch>> {
        (**self).branches()
    }

    fn browse(&self, revision: &str, path: &str) -> Result<FileObject> {
        (**self).browse(revision, path)
    }

    fn content(&self, revision: Option<&str>, path: &str) -> Result<String> {
        (**self).content(revision, path)
    }

    fn modifications(&self, from: &str, to: &str) -> Result<Modifications> {
        (**self).modifications(from, to)
    }
}
