//! Collects the documents touched between two revisions.

use crate::collector::{CollectedPaths, PathCollector, RevisionRange};
use crate::error::Result;
use smeagol_core::{
    ConfigOptions, ConfigResolver, DocumentDirectory, Modifications, RepositoryBackend,
};
use tracing::{debug, trace, warn};

/// Classifies the structural diff of a revision range.
///
/// Added, modified and copied files are stored, removed files deleted; a
/// rename counts as both. Any touch of the configuration file sets
/// `configuration_changed`, but classification always runs to the end.
pub struct DiffCollector<'a> {
    backend: &'a dyn RepositoryBackend,
    options: &'a ConfigOptions,
}

impl<'a> DiffCollector<'a> {
    pub fn new(backend: &'a dyn RepositoryBackend, options: &'a ConfigOptions) -> Self {
        Self { backend, options }
    }
}

impl PathCollector for DiffCollector<'_> {
    type Target = RevisionRange;

    fn collect(&self, range: &RevisionRange) -> Result<CollectedPaths> {
        let repository = self.backend.repository();
        let resolver = ConfigResolver::new(self.backend, self.options);
        // Without a directory no document is managed, but the config file is
        // still watched so that switching documents off purges the index.
        let directory = resolver.resolve(Some(&range.to));

        let modifications = self
            .backend
            .modifications(&range.from, &range.to)
            .map_err(|e| {
                warn!(
                    "could not load modifications from revision {} to {} in repository {}: {}",
                    range.from, range.to, repository, e
                );
                e
            })?;
        trace!(
            "classifying modifications {} of repository {}",
            range,
            repository
        );

        let mut classifier = Classifier {
            directory: directory.as_ref(),
            resolver: &resolver,
            paths: CollectedPaths::default(),
        };
        classifier.classify(&modifications);
        let mut paths = classifier.paths;

        // a path deleted and re-created within the range still exists at `to`
        let stored = &paths.to_store;
        paths.to_delete.retain(|path| !stored.contains(path));

        debug!(
            "collected {} documents to store and {} to delete for {} in repository {}{}",
            paths.to_store.len(),
            paths.to_delete.len(),
            range,
            repository,
            if paths.configuration_changed {
                ", configuration changed"
            } else {
                ""
            }
        );
        Ok(paths)
    }
}

struct Classifier<'r> {
    directory: Option<&'r DocumentDirectory>,
    resolver: &'r ConfigResolver<'r>,
    paths: CollectedPaths,
}

impl Classifier<'_> {
    fn classify(&mut self, modifications: &Modifications) {
        for path in modifications.added.iter().chain(&modifications.modified) {
            self.store(path);
        }
        for copy in &modifications.copied {
            self.store(&copy.target);
        }
        for path in &modifications.removed {
            self.delete(path);
        }
        for rename in &modifications.renamed {
            self.store(&rename.new);
            self.delete(&rename.old);
        }
    }

    fn is_managed(&self, path: &str) -> bool {
        self.directory
            .is_some_and(|directory| directory.is_managed_document(path))
    }

    fn store(&mut self, path: &str) {
        if self.is_managed(path) {
            self.paths.to_store.insert(path.to_string());
        } else if self.resolver.is_config_file(path) {
            self.paths.configuration_changed = true;
        }
    }

    fn delete(&mut self, path: &str) {
        if self.is_managed(path) {
            self.paths.to_delete.insert(path.to_string());
        } else if self.resolver.is_config_file(path) {
            self.paths.configuration_changed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smeagol_core::config::CONFIG_FILE;
    use smeagol_core::MemoryRepository;

    fn repository() -> MemoryRepository {
        let repo = MemoryRepository::new("hog");
        repo.commit("23", &[(CONFIG_FILE, "directory: docs\n")]);
        repo.commit("42", &[]);
        repo.set_branch("main", "42", true);
        repo
    }

    fn collect(repo: &MemoryRepository, modifications: Modifications) -> CollectedPaths {
        repo.set_modifications("23", "42", modifications);
        let options = ConfigOptions::default();
        DiffCollector::new(repo, &options)
            .collect(&RevisionRange::new("23", "42"))
            .unwrap()
    }

    fn set(paths: &[&str]) -> std::collections::BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_classifies_added_modified_and_removed() {
        let repo = repository();
        let paths = collect(
            &repo,
            Modifications::default()
                .added("docs/a.md")
                .modified("docs/b.md")
                .removed("docs/old.md")
                .modified("src/x.go"),
        );

        assert_eq!(paths.to_store, set(&["docs/a.md", "docs/b.md"]));
        assert_eq!(paths.to_delete, set(&["docs/old.md"]));
        assert!(!paths.configuration_changed);
    }

    #[test]
    fn test_copy_target_is_stored() {
        let repo = repository();
        let paths = collect(
            &repo,
            Modifications::default()
                .copied("docs/a.md", "docs/a-copy.md")
                .copied("docs/a.md", "outside/a.md"),
        );

        assert_eq!(paths.to_store, set(&["docs/a-copy.md"]));
        assert!(paths.to_delete.is_empty());
    }

    #[test]
    fn test_rename_stores_new_and_deletes_old() {
        let repo = repository();
        let paths = collect(
            &repo,
            Modifications::default().renamed("docs/old.md", "docs/new.md"),
        );

        assert_eq!(paths.to_store, set(&["docs/new.md"]));
        assert_eq!(paths.to_delete, set(&["docs/old.md"]));
    }

    #[test]
    fn test_rename_across_directory_boundary() {
        let repo = repository();
        let paths = collect(
            &repo,
            Modifications::default()
                .renamed("drafts/in.md", "docs/in.md")
                .renamed("docs/out.md", "archive/out.md"),
        );

        assert_eq!(paths.to_store, set(&["docs/in.md"]));
        assert_eq!(paths.to_delete, set(&["docs/out.md"]));
    }

    #[test]
    fn test_rename_of_unmanaged_file_is_ignored() {
        let repo = repository();
        let paths = collect(
            &repo,
            Modifications::default().renamed("src/a.go", "src/b.go"),
        );

        assert!(paths.is_empty());
        assert!(!paths.configuration_changed);
    }

    #[test]
    fn test_detects_changed_configuration_and_keeps_classifying() {
        let repo = repository();
        let paths = collect(
            &repo,
            Modifications::default()
                .modified(CONFIG_FILE)
                .added("docs/a.md")
                .removed("docs/old.md"),
        );

        assert!(paths.configuration_changed);
        assert_eq!(paths.to_store, set(&["docs/a.md"]));
        assert_eq!(paths.to_delete, set(&["docs/old.md"]));
    }

    #[test]
    fn test_detects_removed_and_renamed_configuration() {
        let repo = repository();
        let removed = collect(&repo, Modifications::default().removed(CONFIG_FILE));
        assert!(removed.configuration_changed);

        let renamed = collect(
            &repo,
            Modifications::default().renamed(CONFIG_FILE, "old.smeagol.yml"),
        );
        assert!(renamed.configuration_changed);
    }

    #[test]
    fn test_disabled_documents_still_detect_configuration_change() {
        let repo = repository();
        repo.commit("43", &[(CONFIG_FILE, "directory: ~\n")]);
        repo.set_modifications(
            "23",
            "43",
            Modifications::default().modified(CONFIG_FILE).added("docs/a.md"),
        );

        let options = ConfigOptions::default();
        let paths = DiffCollector::new(&repo, &options)
            .collect(&RevisionRange::new("23", "43"))
            .unwrap();

        assert!(paths.configuration_changed);
        assert!(paths.is_empty());
    }

    #[test]
    fn test_recreated_path_is_only_stored() {
        let repo = repository();
        let paths = collect(
            &repo,
            Modifications::default()
                .renamed("docs/a.md", "docs/b.md")
                .added("docs/a.md"),
        );

        assert_eq!(paths.to_store, set(&["docs/a.md", "docs/b.md"]));
        assert!(paths.to_delete.is_empty());
    }

    #[test]
    fn test_modification_failure_is_an_error() {
        let repo = repository();
        repo.fail_modifications(true);
        let options = ConfigOptions::default();

        let result = DiffCollector::new(&repo, &options).collect(&RevisionRange::new("23", "42"));
        assert!(result.unwrap_err().is_transient());
    }
}
