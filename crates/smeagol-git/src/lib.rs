//! Smeagol Git - repository backend on top of libgit2
//!
//! This crate connects the synchronizer to real repositories:
//! - [`GitRepository`] implements the backend operations on a repository
//! - [`GitRepositories`] finds the repositories below a root directory and
//!   opens sessions on them
//! - [`RefWatcher`] turns ref updates on disk into sync triggers

mod error;
mod repositories;
mod repository;
mod watcher;

pub use error::{GitError, Result};
pub use repositories::GitRepositories;
pub use repository::GitRepository;
pub use watcher::{classify, RefWatcher};
