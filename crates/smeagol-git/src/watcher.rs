//! Ref watcher for push notifications.
//!
//! Uses the notify crate to watch the repository root and turns ref
//! updates into sync triggers: a moved branch means new commits, a
//! rewritten `HEAD` means another default branch.

use crate::error::Result;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use smeagol_core::RepositoryId;
use smeagol_sync::Trigger;
use std::path::{Component, Path};
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Maps a changed file below `root` to the repository and trigger it
/// stands for. Works for bare repositories and for `.git` directories.
pub fn classify(root: &Path, path: &Path) -> Option<(RepositoryId, Trigger)> {
    let relative = path.strip_prefix(root).ok()?;
    let mut components = relative.components().filter_map(|c| match c {
        Component::Normal(name) => name.to_str(),
        _ => None,
    });

    let repository = components.next()?;
    let mut next = components.next()?;
    if next == ".git" {
        next = components.next()?;
    }
    let rest: Vec<&str> = components.collect();
    if rest.last().unwrap_or(&next).ends_with(".lock") {
        return None;
    }

    let trigger = match (next, rest.is_empty()) {
        ("HEAD", true) => Trigger::DefaultBranchChanged,
        ("packed-refs", true) => Trigger::PostReceive,
        ("refs", false) if rest[0] == "heads" => Trigger::PostReceive,
        _ => return None,
    };
    Some((RepositoryId::new(repository), trigger))
}

/// Watches every repository below a root directory for ref updates.
pub struct RefWatcher {
    #[allow(dead_code)]
    watcher: notify::RecommendedWatcher,
    receiver: Receiver<(RepositoryId, Trigger)>,
}

impl RefWatcher {
    pub fn new(root: &Path) -> Result<Self> {
        let root = root.canonicalize()?;
        let (tx, rx) = channel();

        let events_root = root.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if !matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) {
                        return;
                    }
                    for path in event.paths {
                        let Some((repository, trigger)) = classify(&events_root, &path) else {
                            continue;
                        };
                        debug!(
                            "{} in repository {} ({})",
                            trigger,
                            repository,
                            path.display()
                        );
                        if tx.send((repository, trigger)).is_err() {
                            warn!("Failed to send ref change event");
                        }
                    }
                }
                Err(e) => warn!("Watch error: {}", e),
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        info!("Watching {} for ref updates", root.display());

        Ok(Self {
            watcher,
            receiver: rx,
        })
    }

    /// Returns immediately with any pending triggers.
    pub fn poll(&self) -> Vec<(RepositoryId, Trigger)> {
        self.receiver.try_iter().collect()
    }

    /// Waits for the next trigger with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<(RepositoryId, Trigger)> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn classified(path: &str) -> Option<(RepositoryId, Trigger)> {
        classify(Path::new("/srv/repos"), &PathBuf::from("/srv/repos").join(path))
    }

    #[test]
    fn test_branch_updates_are_pushes() {
        let expected = Some((RepositoryId::new("hog"), Trigger::PostReceive));
        assert_eq!(classified("hog/refs/heads/main"), expected);
        assert_eq!(classified("hog/.git/refs/heads/feature/x"), expected);
        assert_eq!(classified("hog/packed-refs"), expected);
    }

    #[test]
    fn test_head_updates_change_default_branch() {
        assert_eq!(
            classified("hog.git/HEAD"),
            Some((RepositoryId::new("hog.git"), Trigger::DefaultBranchChanged))
        );
        assert_eq!(
            classified("hog/.git/HEAD"),
            Some((RepositoryId::new("hog"), Trigger::DefaultBranchChanged))
        );
    }

    #[test]
    fn test_unrelated_files_are_ignored() {
        assert_eq!(classified("hog/refs/heads/main.lock"), None);
        assert_eq!(classified("hog/HEAD.lock"), None);
        assert_eq!(classified("hog/refs/tags/v1"), None);
        assert_eq!(classified("hog/objects/ab/cdef"), None);
        assert_eq!(classified("hog/.git/index"), None);
        assert_eq!(classified("hog/docs/HEAD"), None);
        assert_eq!(classified("hog"), None);
        assert_eq!(
            classify(Path::new("/srv/repos"), Path::new("/elsewhere/hog/HEAD")),
            None
        );
    }

    #[test]
    fn test_watcher_creation() {
        let dir = tempdir().unwrap();
        let watcher = RefWatcher::new(dir.path());
        assert!(watcher.is_ok());
    }

    #[test]
    fn test_missing_root_fails() {
        let dir = tempdir().unwrap();
        assert!(RefWatcher::new(&dir.path().join("missing")).is_err());
    }
}
