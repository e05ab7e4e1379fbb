//! Repositories living below one root directory.

use crate::error::Result;
use crate::repository::GitRepository;
use git2::{ErrorCode, Repository};
use smeagol_core::{BackendError, RepositoryBackend, RepositoryId};
use smeagol_sync::SessionFactory;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Every direct child directory of `root` that is a git repository, bare
/// or not. The directory name is the repository id.
#[derive(Debug, Clone)]
pub struct GitRepositories {
    root: PathBuf,
}

impl GitRepositories {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of the repository with the given id.
    pub fn path(&self, repository: &RepositoryId) -> PathBuf {
        self.root.join(repository.as_str())
    }

    /// Ids of all repositories below the root, sorted.
    pub fn discover(&self) -> Result<Vec<RepositoryId>> {
        let mut repositories = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if Repository::open(entry.path()).is_ok() {
                trace!("found repository {}", name);
                repositories.push(RepositoryId::new(name));
            }
        }
        repositories.sort();
        debug!(
            "discovered {} repositories in {}",
            repositories.len(),
            self.root.display()
        );
        Ok(repositories)
    }
}

fn is_plain_name(repository: &RepositoryId) -> bool {
    let name = repository.as_str();
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

impl SessionFactory for GitRepositories {
    fn open(&self, repository: &RepositoryId) -> smeagol_core::Result<Box<dyn RepositoryBackend>> {
        let path = self.path(repository);
        if !is_plain_name(repository) {
            return Err(BackendError::not_found(path.display().to_string(), ""));
        }
        match Repository::open(&path) {
            Ok(repo) => Ok(Box::new(GitRepository::new(repository.clone(), repo))),
            Err(e) if e.code() == ErrorCode::NotFound => {
                Err(BackendError::not_found(path.display().to_string(), ""))
            }
            Err(e) => Err(BackendError::io(
                format!("open repository {}", path.display()),
                e,
            )),
        }
    }

    fn repositories(&self) -> smeagol_core::Result<Vec<RepositoryId>> {
        self.discover().map_err(|e| {
            BackendError::io(
                format!("discover repositories in {}", self.root.display()),
                e,
            )
        })
    }
}
