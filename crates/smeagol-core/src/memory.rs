//! In-memory repository backend.
//!
//! History is linear: every commit starts from the snapshot of the
//! previous one. Modifications between two revisions are computed from
//! the snapshots, with a removed and an added file of identical content
//! reported as a rename. Copies are only reported through
//! [`MemoryRepository::set_modifications`].
//!
//! Failures can be injected per operation to exercise error paths.

use crate::backend::RepositoryBackend;
use crate::error::{BackendError, Result};
use crate::repository::{Branch, FileObject, Modifications, RepositoryId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

type Snapshot = BTreeMap<String, String>;

#[derive(Default)]
struct State {
    commits: HashMap<String, Snapshot>,
    last: Option<String>,
    branches: Vec<Branch>,
    modifications: HashMap<(String, String), Modifications>,
    failing_content: HashSet<String>,
    fail_branches: bool,
    fail_browse: bool,
    fail_modifications: bool,
}

/// A repository that lives entirely in memory.
pub struct MemoryRepository {
    id: RepositoryId,
    state: RwLock<State>,
    browse_calls: AtomicUsize,
    modification_calls: AtomicUsize,
}

impl MemoryRepository {
    pub fn new(id: impl Into<RepositoryId>) -> Self {
        Self {
            id: id.into(),
            state: RwLock::new(State::default()),
            browse_calls: AtomicUsize::new(0),
            modification_calls: AtomicUsize::new(0),
        }
    }

    /// Records a commit that writes `files` on top of the previous commit.
    pub fn commit(&self, revision: &str, files: &[(&str, &str)]) {
        self.commit_with(revision, files, &[]);
    }

    /// Records a commit that writes `files` and deletes `removed`.
    pub fn commit_with(&self, revision: &str, files: &[(&str, &str)], removed: &[&str]) {
        let mut state = self.write();
        let mut snapshot = state
            .last
            .as_ref()
            .and_then(|last| state.commits.get(last))
            .cloned()
            .unwrap_or_default();
        for (path, content) in files {
            snapshot.insert((*path).to_string(), (*content).to_string());
        }
        for path in removed {
            snapshot.remove(*path);
        }
        state.commits.insert(revision.to_string(), snapshot);
        state.last = Some(revision.to_string());
    }

    /// Creates or moves a branch. Marking it default clears the marker on
    /// every other branch.
    pub fn set_branch(&self, name: &str, revision: &str, default: bool) {
        let mut state = self.write();
        if default {
            for branch in &mut state.branches {
                branch.default = false;
            }
        }
        state.branches.retain(|b| b.name != name);
        state.branches.push(Branch {
            name: name.to_string(),
            revision: revision.to_string(),
            default,
        });
    }

    pub fn remove_branch(&self, name: &str) {
        self.write().branches.retain(|b| b.name != name);
    }

    /// Overrides the computed modifications for one revision range.
    pub fn set_modifications(&self, from: &str, to: &str, modifications: Modifications) {
        self.write()
            .modifications
            .insert((from.to_string(), to.to_string()), modifications);
    }

    /// Makes every read of `path` fail with an I/O error.
    pub fn fail_content(&self, path: &str) {
        self.write().failing_content.insert(path.to_string());
    }

    pub fn fail_branches(&self, fail: bool) {
        self.write().fail_branches = fail;
    }

    pub fn fail_browse(&self, fail: bool) {
        self.write().fail_browse = fail;
    }

    pub fn fail_modifications(&self, fail: bool) {
        self.write().fail_modifications = fail;
    }

    /// Number of browse requests served so far.
    pub fn browse_calls(&self) -> usize {
        self.browse_calls.load(Ordering::SeqCst)
    }

    /// Number of modification requests served so far.
    pub fn modification_calls(&self) -> usize {
        self.modification_calls.load(Ordering::SeqCst)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn snapshot<'s>(state: &'s State, revision: &str) -> Result<&'s Snapshot> {
    state
        .commits
        .get(revision)
        .ok_or_else(|| BackendError::not_found("", revision))
}

fn tree(path: &str, files: &[&str]) -> FileObject {
    let mut leaves = Vec::new();
    let mut directories: BTreeMap<String, Vec<&str>> = BTreeMap::new();

    for file in files {
        let rest = if path.is_empty() {
            *file
        } else {
            &file[path.len() + 1..]
        };
        match rest.split_once('/') {
            Some((directory, _)) => {
                let directory = if path.is_empty() {
                    directory.to_string()
                } else {
                    format!("{}/{}", path, directory)
                };
                directories.entry(directory).or_default().push(*file);
            }
            None => leaves.push(FileObject::file(*file)),
        }
    }

    let mut children = leaves;
    for (directory, files) in directories {
        children.push(tree(&directory, &files));
    }
    FileObject::directory(path, children)
}

fn compute_modifications(from: &Snapshot, to: &Snapshot) -> Modifications {
    let mut modifications = Modifications::default();
    let mut removed: Vec<&String> = from.keys().filter(|p| !to.contains_key(*p)).collect();

    for (path, content) in to {
        match from.get(path) {
            Some(old) if old != content => modifications.modified.push(path.clone()),
            Some(_) => {}
            None => {
                let origin = removed.iter().position(|r| from.get(*r) == Some(content));
                match origin {
                    Some(index) => {
                        let old = removed.remove(index);
                        modifications = modifications.renamed(old.clone(), path.clone());
                    }
                    None => modifications.added.push(path.clone()),
                }
            }
        }
    }

    modifications.removed = removed.into_iter().cloned().collect();
    modifications
}

impl RepositoryBackend for MemoryRepository {
    fn repository(&self) -> &RepositoryId {
        &self.id
    }

    fn branches(&self) -> Result<Vec<Branch>> {
        let state = self.read();
        if state.fail_branches {
            return Err(BackendError::io("list branches", "injected failure"));
        }
        Ok(state.branches.clone())
    }

    fn browse(&self, revision: &str, path: &str) -> Result<FileObject> {
        self.browse_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.read();
        if state.fail_browse {
            return Err(BackendError::io("browse", "injected failure"));
        }

        let snapshot = snapshot(&state, revision)?;
        let path = path.trim_matches('/');
        if snapshot.contains_key(path) {
            return Ok(FileObject::file(path));
        }

        let files: Vec<&str> = snapshot
            .keys()
            .map(String::as_str)
            .filter(|p| path.is_empty() || p.strip_prefix(path).is_some_and(|r| r.starts_with('/')))
            .collect();
        if files.is_empty() && !path.is_empty() {
            return Err(BackendError::not_found(path, revision));
        }
        Ok(tree(path, &files))
    }

    fn content(&self, revision: Option<&str>, path: &str) -> Result<String> {
        let state = self.read();
        if state.failing_content.contains(path) {
            return Err(BackendError::io(format!("read {}", path), "injected failure"));
        }

        let revision = match revision {
            Some(revision) => revision.to_string(),
            None => state
                .branches
                .iter()
                .find(|b| b.default)
                .map(|b| b.revision.clone())
                .ok_or_else(|| BackendError::not_found(path, "default branch"))?,
        };

        snapshot(&state, &revision)?
            .get(path)
            .cloned()
            .ok_or_else(|| BackendError::not_found(path, revision))
    }

    fn modifications(&self, from: &str, to: &str) -> Result<Modifications> {
        self.modification_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.read();
        if state.fail_modifications {
            return Err(BackendError::io("compute modifications", "injected failure"));
        }

        if let Some(modifications) = state.modifications.get(&(from.to_string(), to.to_string())) {
            return Ok(modifications.clone());
        }
        Ok(compute_modifications(
            snapshot(&state, from)?,
            snapshot(&state, to)?,
        ))
    }
}
