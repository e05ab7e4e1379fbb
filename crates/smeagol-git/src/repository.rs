//! [`RepositoryBackend`] for a git repository.

use crate::error::Result;
use git2::{
    BranchType, Commit, Delta, DiffFindOptions, ErrorCode, FileMode, ObjectType, Repository, Tree,
};
use smeagol_core::{
    BackendError, Branch, FileObject, Modifications, RepositoryBackend, RepositoryId,
};
use std::path::Path;
use tracing::trace;

const BRANCH_PREFIX: &str = "refs/heads/";

/// A session on one git repository, bare or with a working tree.
///
/// Everything is read from the object database; the working tree is never
/// looked at. The default branch is the one `HEAD` points to.
pub struct GitRepository {
    id: RepositoryId,
    repo: Repository,
}

impl GitRepository {
    pub fn new(id: impl Into<RepositoryId>, repo: Repository) -> Self {
        Self {
            id: id.into(),
            repo,
        }
    }

    pub fn open(id: impl Into<RepositoryId>, path: &Path) -> Result<Self> {
        Ok(Self::new(id, Repository::open(path)?))
    }

    /// Name of the branch `HEAD` points to, even if it has no commits yet.
    fn head_branch(&self) -> smeagol_core::Result<Option<String>> {
        let head = match self.repo.find_reference("HEAD") {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(BackendError::io("read HEAD", e)),
        };
        Ok(head
            .symbolic_target()
            .and_then(|target| target.strip_prefix(BRANCH_PREFIX))
            .map(str::to_string))
    }

    fn commit(&self, revision: &str) -> smeagol_core::Result<Commit<'_>> {
        self.repo
            .revparse_single(revision)
            .and_then(|object| object.peel_to_commit())
            .map_err(lookup("", revision))
    }

    fn tree(&self, revision: &str) -> smeagol_core::Result<Tree<'_>> {
        self.commit(revision)?
            .tree()
            .map_err(io(format!("read tree of {}", revision)))
    }

    fn expand(&self, tree: &Tree<'_>, path: &str) -> smeagol_core::Result<FileObject> {
        let mut children = Vec::new();
        for entry in tree.iter() {
            let Some(name) = entry.name() else {
                trace!("skipping non utf-8 entry in {}", path);
                continue;
            };
            let child = if path.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", path, name)
            };
            match entry.kind() {
                Some(ObjectType::Tree) => {
                    let subtree = self
                        .repo
                        .find_tree(entry.id())
                        .map_err(io(format!("read tree {}", child)))?;
                    children.push(self.expand(&subtree, &child)?);
                }
                Some(ObjectType::Blob) => children.push(FileObject::file(child)),
                // submodules
                _ => {}
            }
        }
        Ok(FileObject::directory(path, children))
    }
}

/// Maps libgit2's not-found code onto [`BackendError::NotFound`].
fn lookup<'a>(path: &'a str, revision: &'a str) -> impl FnOnce(git2::Error) -> BackendError + 'a {
    move |e| {
        if e.code() == ErrorCode::NotFound {
            BackendError::not_found(path, revision)
        } else {
            BackendError::io(format!("look up '{}' in {}", path, revision), e)
        }
    }
}

fn io(context: String) -> impl FnOnce(git2::Error) -> BackendError {
    move |e| BackendError::io(context, e)
}

fn delta_path(file: git2::DiffFile<'_>) -> Option<String> {
    if file.mode() == FileMode::Commit {
        return None;
    }
    file.path().and_then(Path::to_str).map(str::to_string)
}

impl RepositoryBackend for GitRepository {
    fn repository(&self) -> &RepositoryId {
        &self.id
    }

    fn branches(&self) -> smeagol_core::Result<Vec<Branch>> {
        let head = self.head_branch()?;
        let mut branches = Vec::new();
        let local = self
            .repo
            .branches(Some(BranchType::Local))
            .map_err(io("list branches".to_string()))?;
        for item in local {
            let (branch, _) = item.map_err(io("list branches".to_string()))?;
            let Some(revision) = branch.get().target() else {
                continue;
            };
            let name = match branch.name() {
                Ok(Some(name)) => name.to_string(),
                _ => continue,
            };
            let default = head.as_deref() == Some(name.as_str());
            branches.push(Branch {
                name,
                revision: revision.to_string(),
                default,
            });
        }
        Ok(branches)
    }

    fn browse(&self, revision: &str, path: &str) -> smeagol_core::Result<FileObject> {
        let tree = self.tree(revision)?;
        let path = path.trim_matches('/');
        if path.is_empty() {
            return self.expand(&tree, "");
        }

        let entry = tree
            .get_path(Path::new(path))
            .map_err(lookup(path, revision))?;
        match entry.kind() {
            Some(ObjectType::Tree) => {
                let subtree = self
                    .repo
                    .find_tree(entry.id())
                    .map_err(io(format!("read tree {}", path)))?;
                self.expand(&subtree, path)
            }
            Some(ObjectType::Blob) => Ok(FileObject::file(path)),
            _ => Err(BackendError::not_found(path, revision)),
        }
    }

    fn content(&self, revision: Option<&str>, path: &str) -> smeagol_core::Result<String> {
        let revision = revision.unwrap_or("HEAD");
        let entry = self
            .tree(revision)?
            .get_path(Path::new(path))
            .map_err(lookup(path, revision))?;
        if entry.kind() != Some(ObjectType::Blob) {
            return Err(BackendError::not_found(path, revision));
        }
        let blob = self
            .repo
            .find_blob(entry.id())
            .map_err(lookup(path, revision))?;
        Ok(String::from_utf8_lossy(blob.content()).into_owned())
    }

    fn modifications(&self, from: &str, to: &str) -> smeagol_core::Result<Modifications> {
        let old = self.tree(from)?;
        let new = self.tree(to)?;
        let context = || format!("diff {}..{}", from, to);

        let mut diff = self
            .repo
            .diff_tree_to_tree(Some(&old), Some(&new), None)
            .map_err(io(context()))?;
        let mut find = DiffFindOptions::new();
        find.renames(true).copies(true);
        diff.find_similar(Some(&mut find)).map_err(io(context()))?;

        let mut modifications = Modifications::default();
        for delta in diff.deltas() {
            let old_path = delta_path(delta.old_file());
            let new_path = delta_path(delta.new_file());
            modifications = match (delta.status(), old_path, new_path) {
                (Delta::Added, _, Some(path)) => modifications.added(path),
                (Delta::Modified | Delta::Typechange, _, Some(path)) => {
                    modifications.modified(path)
                }
                (Delta::Deleted, Some(path), _) => modifications.removed(path),
                (Delta::Renamed, Some(old), Some(new)) => modifications.renamed(old, new),
                (Delta::Copied, Some(source), Some(target)) => {
                    modifications.copied(source, target)
                }
                _ => modifications,
            };
        }
        trace!(
            "computed modifications {}..{} of repository {}",
            from,
            to,
            self.id
        );
        Ok(modifications)
    }
}
