//! Smeagol Index - document storage and sync watermarks
//!
//! Two pieces of durable state live here, both in one sled database:
//!
//! - the document index: one [`IndexedDocument`] per managed Markdown file,
//!   keyed by repository and path
//! - the [`IndexStatus`] of each repository: which revision of which branch
//!   the index reflects, and with which document schema version
//!
//! The [`Indexer`] ties a repository backend to a [`SearchEngine`] and is
//! the only thing the synchronizer uses to mutate documents.

pub mod document;
pub mod engine;
pub mod error;
pub mod indexer;
pub mod status;

pub use document::{pull_permission, DocumentId, IndexedDocument, DOCUMENT_VERSION};
pub use engine::{SearchEngine, SledSearchEngine};
pub use error::{IndexError, Result};
pub use indexer::Indexer;
pub use status::{IndexStatus, IndexStatusStore};
