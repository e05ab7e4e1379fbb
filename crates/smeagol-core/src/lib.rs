//! Smeagol Core - repository model and configuration
//!
//! This crate holds the vocabulary the rest of Smeagol speaks:
//! repository identifiers, branches, browse trees and modification sets,
//! plus the [`RepositoryBackend`] trait that version-control backends
//! implement.
//!
//! It also resolves the per-repository `.smeagol.yml` to find out which
//! directory holds the Markdown documents that get indexed.
//!
//! # Example
//!
//! ```
//! use smeagol_core::{ConfigOptions, ConfigResolver, MemoryRepository};
//!
//! let repo = MemoryRepository::new("hitchhiker");
//! repo.commit("1", &[(".smeagol.yml", "directory: wiki\n"), ("wiki/Home.md", "# Home")]);
//! repo.set_branch("main", "1", true);
//!
//! let options = ConfigOptions::default();
//! let directory = ConfigResolver::new(&repo, &options).resolve(Some("1")).unwrap();
//! assert!(directory.is_managed_document("wiki/Home.md"));
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod memory;
pub mod repository;

pub use backend::RepositoryBackend;
pub use config::{ConfigOptions, ConfigResolver, DocumentDirectory};
pub use error::{BackendError, Result};
pub use memory::MemoryRepository;
pub use repository::{Branch, Copied, FileObject, Modifications, Renamed, RepositoryId};
