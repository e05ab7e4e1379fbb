//! Repository model.
//!
//! Plain data types shared by backends, collectors and the indexer.
//! Revisions and branch names are opaque strings: they are compared for
//! equality and never ordered.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a repository, stable across renames.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryId(String);

impl RepositoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RepositoryId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RepositoryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A branch and the revision at its tip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub revision: String,
    /// Whether the backend marks this as the repository's default branch.
    pub default: bool,
}

impl Branch {
    pub fn new(name: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            revision: revision.into(),
            default: false,
        }
    }

    /// Creates a branch carrying the default marker.
    pub fn default_branch(name: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            default: true,
            ..Self::new(name, revision)
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.revision)
    }
}

/// A node of a browse result: either a file or a directory with children.
///
/// Paths are repository-relative and use `/` as separator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileObject {
    pub path: String,
    pub directory: bool,
    pub children: Vec<FileObject>,
}

impl FileObject {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            directory: false,
            children: Vec::new(),
        }
    }

    pub fn directory(path: impl Into<String>, children: Vec<FileObject>) -> Self {
        Self {
            path: path.into(),
            directory: true,
            children,
        }
    }

    /// Iterates over every file (non-directory) below and including this node.
    pub fn files(&self) -> Vec<&FileObject> {
        let mut files = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.directory {
                stack.extend(node.children.iter());
            } else {
                files.push(node);
            }
        }
        files
    }
}

/// A file copied from `source` to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Copied {
    pub source: String,
    pub target: String,
}

/// A file moved from `old` to `new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renamed {
    pub old: String,
    pub new: String,
}

/// Structural changes between two revisions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Modifications {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub copied: Vec<Copied>,
    pub removed: Vec<String>,
    pub renamed: Vec<Renamed>,
}

impl Modifications {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.modified.is_empty()
            && self.copied.is_empty()
            && self.removed.is_empty()
            && self.renamed.is_empty()
    }

    pub fn added(mut self, path: impl Into<String>) -> Self {
        self.added.push(path.into());
        self
    }

    pub fn modified(mut self, path: impl Into<String>) -> Self {
        self.modified.push(path.into());
        self
    }

    pub fn copied(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.copied.push(Copied {
            source: source.into(),
            target: target.into(),
        });
        self
    }

    pub fn removed(mut self, path: impl Into<String>) -> Self {
        self.removed.push(path.into());
        self
    }

    pub fn renamed(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.renamed.push(Renamed {
            old: old.into(),
            new: new.into(),
        });
        self
    }
}
