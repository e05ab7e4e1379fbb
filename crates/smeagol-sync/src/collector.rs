//! Path collection strategies.
//!
//! A collector decides which documents a sync step has to (re)store and
//! which it has to delete. [`FullScanCollector`](crate::FullScanCollector)
//! walks a whole revision, [`DiffCollector`](crate::DiffCollector) looks at
//! the changes between two revisions. The worker picks one explicitly.

use crate::error::Result;
use std::collections::BTreeSet;
use std::fmt;

/// What a collector found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedPaths {
    /// New or changed documents that must be read and written.
    pub to_store: BTreeSet<String>,

    /// Documents that no longer exist at the target revision.
    pub to_delete: BTreeSet<String>,

    /// The configuration file changed within the collected range, so the
    /// sets above may be based on a stale document directory.
    pub configuration_changed: bool,
}

impl CollectedPaths {
    pub fn is_empty(&self) -> bool {
        self.to_store.is_empty() && self.to_delete.is_empty()
    }
}

/// Produces the paths for one synchronization step.
pub trait PathCollector {
    /// What the collector looks at: a revision or a revision range.
    type Target: ?Sized;

    fn collect(&self, target: &Self::Target) -> Result<CollectedPaths>;
}

/// The revisions between an indexed watermark and a new head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRange {
    pub from: String,
    pub to: String,
}

impl RevisionRange {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl fmt::Display for RevisionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}
