//! Per-repository configuration.
//!
//! A repository opts into Smeagol with a `.smeagol.yml` at its root. The
//! only key we care about is `directory`, which names the folder holding
//! the wiki pages. Reading the file never fails: anything unexpected falls
//! back to the default directory.

use crate::backend::RepositoryBackend;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::{debug, trace, warn};

/// Name of the configuration file at the repository root.
pub const CONFIG_FILE: &str = ".smeagol.yml";

/// Directory used when the configuration does not name one.
pub const DEFAULT_DIRECTORY: &str = "docs";

const DIRECTORY_KEY: &str = "directory";
const MARKDOWN_SUFFIX: &[u8] = b".md";

/// Installation-wide settings for configuration resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOptions {
    /// Path of the configuration file inside each repository.
    pub file: String,

    /// Directory assumed when the file is missing or names none.
    pub default_directory: String,

    /// Treat repositories without a configuration file as having no
    /// documents at all instead of using the default directory.
    pub require_config_file: bool,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            file: CONFIG_FILE.to_string(),
            default_directory: DEFAULT_DIRECTORY.to_string(),
            require_config_file: false,
        }
    }
}

/// The resolved document directory of a repository.
///
/// Stored normalized: no leading `./` or `/`, no trailing `/`. The empty
/// string stands for the repository root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentDirectory {
    path: String,
}

impl DocumentDirectory {
    pub fn new(path: &str) -> Self {
        Self {
            path: normalize(path).to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Whether `path` is a Markdown file inside this directory.
    ///
    /// The prefix check works on whole path components, so `docs` does not
    /// manage `docsx/a.md`. The `.md` suffix is matched case-insensitively.
    pub fn is_managed_document(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        let bytes = path.as_bytes();
        let markdown = bytes.len() > MARKDOWN_SUFFIX.len()
            && bytes[bytes.len() - MARKDOWN_SUFFIX.len()..].eq_ignore_ascii_case(MARKDOWN_SUFFIX);
        markdown && self.contains(path)
    }

    fn contains(&self, path: &str) -> bool {
        if self.is_root() {
            return true;
        }
        match path.strip_prefix(self.path.as_str()) {
            Some(rest) => rest.starts_with('/'),
            None => false,
        }
    }
}

impl std::fmt::Display for DocumentDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_root() {
            f.write_str("/")
        } else {
            f.write_str(&self.path)
        }
    }
}

fn normalize(path: &str) -> &str {
    let mut path = path.trim();
    loop {
        let stripped = path.trim_start_matches('/');
        let stripped = stripped.strip_prefix("./").unwrap_or(stripped);
        if stripped.len() == path.len() {
            break;
        }
        path = stripped;
    }
    let path = path.trim_end_matches('/');
    if path == "." {
        ""
    } else {
        path
    }
}

/// Reads `.smeagol.yml` through a backend session.
pub struct ConfigResolver<'a> {
    backend: &'a dyn RepositoryBackend,
    options: &'a ConfigOptions,
    /// `options.file` relative to the repository root.
    file: &'a str,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(backend: &'a dyn RepositoryBackend, options: &'a ConfigOptions) -> Self {
        Self {
            backend,
            options,
            file: normalize(&options.file),
        }
    }

    /// Resolves the document directory at `revision`, or at the default
    /// revision when `None`.
    ///
    /// Returns `None` only when documents are switched off: either the
    /// configuration sets `directory` to null or blank, or the file is
    /// missing and [`ConfigOptions::require_config_file`] is set.
    pub fn resolve(&self, revision: Option<&str>) -> Option<DocumentDirectory> {
        match self.read(revision) {
            Some(content) => self.parse(&content),
            None if self.options.require_config_file => {
                trace!(
                    "repository {} has no {}, no documents to index",
                    self.backend.repository(),
                    self.file
                );
                None
            }
            None => Some(self.default_directory()),
        }
    }

    /// Whether `path` is the configuration file itself.
    pub fn is_config_file(&self, path: &str) -> bool {
        path.trim_start_matches('/') == self.file
    }

    fn read(&self, revision: Option<&str>) -> Option<String> {
        if let Some(revision) = revision {
            trace!("reading {} at revision {}", self.file, revision);
        }
        match self.backend.content(revision, self.file) {
            Ok(content) => Some(content),
            Err(e) if e.is_not_found() => {
                trace!(
                    "no file '{}' found in repository {}",
                    self.file,
                    self.backend.repository()
                );
                None
            }
            Err(e) => {
                warn!(
                    "could not read smeagol configuration for repository {}: {}",
                    self.backend.repository(),
                    e
                );
                None
            }
        }
    }

    fn parse(&self, content: &str) -> Option<DocumentDirectory> {
        let document: Value = match serde_yaml::from_str(content) {
            Ok(document) => document,
            Err(e) => {
                debug!(
                    "malformed {} in repository {}, using default directory: {}",
                    self.file,
                    self.backend.repository(),
                    e
                );
                return Some(self.default_directory());
            }
        };

        let Value::Mapping(config) = document else {
            trace!(
                "found empty smeagol configuration for repository {}",
                self.backend.repository()
            );
            return Some(self.default_directory());
        };

        let directory = match config.get(DIRECTORY_KEY) {
            None => return Some(self.default_directory()),
            Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            Some(other) => {
                debug!(
                    "ignoring non-scalar directory {:?} in repository {}",
                    other,
                    self.backend.repository()
                );
                return Some(self.default_directory());
            }
        };

        match directory {
            Some(directory) if !directory.trim().is_empty() => {
                trace!(
                    "found smeagol configuration with directory {} for repository {}",
                    directory,
                    self.backend.repository()
                );
                Some(DocumentDirectory::new(&directory))
            }
            _ => {
                debug!(
                    "documents are disabled for repository {}",
                    self.backend.repository()
                );
                None
            }
        }
    }

    fn default_directory(&self) -> DocumentDirectory {
        DocumentDirectory::new(&self.options.default_directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRepository;

    fn repository_with_config(config: &str) -> MemoryRepository {
        let repo = MemoryRepository::new("heart-of-gold");
        repo.commit("1", &[(CONFIG_FILE, config)]);
        repo.set_branch("main", "1", true);
        repo
    }

    fn resolve(repo: &MemoryRepository, options: &ConfigOptions) -> Option<DocumentDirectory> {
        ConfigResolver::new(repo, options).resolve(None)
    }

    #[test]
    fn test_resolves_configured_directory() {
        let repo = repository_with_config("test: 12\ndirectory: dokumente\n");
        let directory = resolve(&repo, &ConfigOptions::default()).unwrap();
        assert_eq!(directory.as_str(), "dokumente");
    }

    #[test]
    fn test_missing_directory_key_uses_default() {
        let repo = repository_with_config("test: 12\n");
        let directory = resolve(&repo, &ConfigOptions::default()).unwrap();
        assert_eq!(directory.as_str(), DEFAULT_DIRECTORY);
    }

    #[test]
    fn test_empty_file_uses_default() {
        let repo = repository_with_config("");
        let directory = resolve(&repo, &ConfigOptions::default()).unwrap();
        assert_eq!(directory.as_str(), DEFAULT_DIRECTORY);
    }

    #[test]
    fn test_malformed_yaml_uses_default() {
        let repo = repository_with_config("directory: [unclosed\n");
        let directory = resolve(&repo, &ConfigOptions::default()).unwrap();
        assert_eq!(directory.as_str(), DEFAULT_DIRECTORY);
    }

    #[test]
    fn test_missing_file_uses_default() {
        let repo = MemoryRepository::new("heart-of-gold");
        repo.commit("1", &[("README.md", "hello")]);
        repo.set_branch("main", "1", true);

        let directory = resolve(&repo, &ConfigOptions::default()).unwrap();
        assert_eq!(directory.as_str(), DEFAULT_DIRECTORY);
    }

    #[test]
    fn test_missing_file_when_required_disables_documents() {
        let repo = MemoryRepository::new("heart-of-gold");
        repo.commit("1", &[("README.md", "hello")]);
        repo.set_branch("main", "1", true);

        let options = ConfigOptions {
            require_config_file: true,
            ..ConfigOptions::default()
        };
        assert!(resolve(&repo, &options).is_none());
    }

    #[test]
    fn test_io_failure_falls_back_to_default() {
        let repo = repository_with_config("directory: wiki\n");
        repo.fail_content(CONFIG_FILE);

        let directory = resolve(&repo, &ConfigOptions::default()).unwrap();
        assert_eq!(directory.as_str(), DEFAULT_DIRECTORY);
    }

    #[test]
    fn test_null_directory_disables_documents() {
        let repo = repository_with_config("directory: ~\n");
        assert!(resolve(&repo, &ConfigOptions::default()).is_none());

        let repo = repository_with_config("directory: '  '\n");
        assert!(resolve(&repo, &ConfigOptions::default()).is_none());
    }

    #[test]
    fn test_resolves_at_given_revision() {
        let repo = repository_with_config("directory: wiki\n");
        repo.commit("2", &[(CONFIG_FILE, "directory: pages\n")]);

        let options = ConfigOptions::default();
        let resolver = ConfigResolver::new(&repo, &options);
        assert_eq!(resolver.resolve(Some("1")).unwrap().as_str(), "wiki");
        assert_eq!(resolver.resolve(Some("2")).unwrap().as_str(), "pages");
        // default branch still points at revision 1
        assert_eq!(resolver.resolve(None).unwrap().as_str(), "wiki");
    }

    #[test]
    fn test_is_managed_document() {
        let directory = DocumentDirectory::new("dokumente");

        assert!(directory.is_managed_document("dokumente/a.md"));
        assert!(directory.is_managed_document("dokumente/A.MD"));
        assert!(directory.is_managed_document("dokumente/sub/b.Md"));
        assert!(!directory.is_managed_document("dokumente/b.png"));
        assert!(!directory.is_managed_document("docs/a.md"));
        assert!(!directory.is_managed_document("dokumentex/a.md"));
        assert!(!directory.is_managed_document("a.md"));
    }

    #[test]
    fn test_directory_is_normalized() {
        assert_eq!(DocumentDirectory::new("./docs/").as_str(), "docs");
        assert_eq!(DocumentDirectory::new("/docs/wiki").as_str(), "docs/wiki");
        assert!(DocumentDirectory::new(".").is_root());
        assert!(DocumentDirectory::new("/").is_root());
    }

    #[test]
    fn test_root_directory_manages_every_markdown_file() {
        let directory = DocumentDirectory::new(".");
        assert!(directory.is_managed_document("README.md"));
        assert!(directory.is_managed_document("deep/down/page.md"));
        assert!(!directory.is_managed_document("src/main.rs"));
    }

    #[test]
    fn test_is_config_file() {
        let repo = repository_with_config("");
        let options = ConfigOptions::default();
        let resolver = ConfigResolver::new(&repo, &options);

        assert!(resolver.is_config_file(".smeagol.yml"));
        assert!(resolver.is_config_file("/.smeagol.yml"));
        assert!(!resolver.is_config_file("docs/.smeagol.yml"));
    }

    #[test]
    fn test_relative_config_file_name_is_read_and_detected() {
        let repo = repository_with_config("directory: wiki\n");
        let options = ConfigOptions {
            file: "./.smeagol.yml".to_string(),
            ..ConfigOptions::default()
        };
        let resolver = ConfigResolver::new(&repo, &options);

        assert_eq!(resolver.resolve(None), Some(DocumentDirectory::new("wiki")));
        assert!(resolver.is_config_file(".smeagol.yml"));
    }
}
