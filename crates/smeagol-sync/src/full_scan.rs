//! Collects every document of one revision.

use crate::collector::{CollectedPaths, PathCollector};
use crate::error::Result;
use smeagol_core::{ConfigOptions, ConfigResolver, RepositoryBackend};
use tracing::{debug, info, warn};

/// Walks the document directory of a revision.
///
/// Only ever fills `to_store`: stale documents are removed by the purge
/// that precedes a full rebuild, not by the scan.
pub struct FullScanCollector<'a> {
    backend: &'a dyn RepositoryBackend,
    options: &'a ConfigOptions,
}

impl<'a> FullScanCollector<'a> {
    pub fn new(backend: &'a dyn RepositoryBackend, options: &'a ConfigOptions) -> Self {
        Self { backend, options }
    }
}

impl PathCollector for FullScanCollector<'_> {
    type Target = str;

    fn collect(&self, revision: &str) -> Result<CollectedPaths> {
        let repository = self.backend.repository();
        let mut paths = CollectedPaths::default();

        let resolver = ConfigResolver::new(self.backend, self.options);
        let Some(directory) = resolver.resolve(Some(revision)) else {
            return Ok(paths);
        };

        debug!(
            "browsing smeagol documents in directory {} in revision {} in repository {}",
            directory, revision, repository
        );
        let tree = match self.backend.browse(revision, directory.as_str()) {
            Ok(tree) => tree,
            Err(e) if e.is_not_found() => {
                info!(
                    "configured smeagol directory '{}' not found in revision {} in repository {}",
                    directory, revision, repository
                );
                return Ok(paths);
            }
            Err(e) => {
                warn!(
                    "error while browsing documents for repository {} with revision {}: {}",
                    repository, revision, e
                );
                return Err(e.into());
            }
        };

        paths.to_store = tree
            .files()
            .into_iter()
            .filter(|file| directory.is_managed_document(&file.path))
            .map(|file| file.path.clone())
            .collect();

        debug!(
            "found {} documents in revision {} of repository {}",
            paths.to_store.len(),
            revision,
            repository
        );
        Ok(paths)
    }
}
