//! Smeagol Sync - keeps the search index in step with the repositories
//!
//! For every repository the index remembers a watermark: the revision of
//! the default branch it was built from. A sync compares that watermark
//! with the current head and then does the least amount of work that
//! leaves the index consistent:
//!
//! - nothing, if the head did not move
//! - an incremental update from the structural diff, if it did
//! - a full rebuild, if the schema, the default branch or the
//!   `.smeagol.yml` changed
//! - a purge, if the repository has no head at all
//!
//! The [`SyncWorker`] runs that decision for one repository and one
//! backend session. The [`SyncCoordinator`] opens sessions, serializes
//! syncs per repository and runs startup catch-up scans in parallel.

mod collector;
mod coordinator;
mod diff;
mod error;
mod full_scan;
mod head;
mod worker;

#[cfg(test)]
mod test_utils;

pub use collector::{CollectedPaths, PathCollector, RevisionRange};
pub use coordinator::{SessionFactory, SyncCoordinator, SyncOptions, SyncReport, Trigger};
pub use diff::DiffCollector;
pub use error::{Result, SyncError};
pub use full_scan::FullScanCollector;
pub use head::HeadResolver;
pub use worker::{ReindexReason, SyncOutcome, SyncWorker};
