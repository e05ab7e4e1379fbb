//! Installation settings stored as `config.json` in the data directory.

use serde::{Deserialize, Serialize};
use smeagol_sync::SyncOptions;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SETTINGS_FILE: &str = "config.json";
const INDEX_DIR: &str = "index";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid settings in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sync: SyncOptions,

    /// How long the watcher waits for a burst of ref updates to settle.
    pub debounce_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sync: SyncOptions::default(),
            debounce_ms: 500,
        }
    }
}

impl Settings {
    /// Reads the settings of a data directory. A missing file yields the
    /// defaults.
    pub fn load(data_dir: &Path) -> Result<Self, SettingsError> {
        let path = data_dir.join(SETTINGS_FILE);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(SettingsError::Io { path, source }),
        };
        serde_json::from_str(&text).map_err(|source| SettingsError::Json { path, source })
    }

    pub fn save(&self, data_dir: &Path) -> Result<PathBuf, SettingsError> {
        let path = data_dir.join(SETTINGS_FILE);
        let io_error = |source| SettingsError::Io {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(data_dir).map_err(io_error)?;
        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(io_error)?;
        Ok(path)
    }
}

/// `<platform data dir>/smeagol`, or `./.smeagol` where the platform has
/// none.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("smeagol"))
        .unwrap_or_else(|| PathBuf::from(".smeagol"))
}

/// Location of the sled database holding documents and statuses.
pub fn index_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(INDEX_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        assert_eq!(Settings::load(dir.path()).unwrap(), Settings::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"sync": {"config": {"default_directory": "wiki"}}}"#,
        )
        .unwrap();

        let settings = Settings::load(dir.path()).unwrap();

        assert_eq!(settings.sync.config.default_directory, "wiki");
        assert_eq!(settings.sync.config.file, ".smeagol.yml");
        assert_eq!(settings.sync.concurrency, 4);
        assert_eq!(settings.debounce_ms, 500);
    }

    #[test]
    fn test_saved_settings_load_back() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("nested");
        let mut settings = Settings::default();
        settings.sync.config.require_config_file = true;

        let path = settings.save(&data_dir).unwrap();

        assert!(path.exists());
        assert_eq!(Settings::load(&data_dir).unwrap(), settings);
    }

    #[test]
    fn test_invalid_file_names_path() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), "{ not json").unwrap();

        let err = Settings::load(dir.path()).unwrap_err();
        assert!(matches!(err, SettingsError::Json { .. }));
        assert!(err.to_string().contains(SETTINGS_FILE));
    }
}
