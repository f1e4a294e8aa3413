//! Application settings and configuration types.
//!
//! Settings are persisted to `settings.json` in the user's config directory
//! (XDG on Linux) and loaded when a session starts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::AutoAdvance;

/// Errors raised while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config directory available for this platform")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for settings operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Mailbox behavior.
    #[serde(default)]
    pub behavior: BehaviorSettings,
    /// Local storage.
    #[serde(default)]
    pub storage: StorageSettings,
}

/// How the mailbox reacts to destructive actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorSettings {
    /// Policy used when the account has none and the layout cannot prompt.
    pub default_auto_advance: AutoAdvance,
    /// Delay before the undo bar appears, in milliseconds.
    pub undo_bar_delay_ms: u64,
    /// Screen layout.
    pub layout: Layout,
}

impl Default for BehaviorSettings {
    fn default() -> Self {
        Self {
            default_auto_advance: AutoAdvance::List,
            undo_bar_delay_ms: 500,
            layout: Layout::SinglePane,
        }
    }
}

impl BehaviorSettings {
    pub fn undo_bar_delay(&self) -> Duration {
        Duration::from_millis(self.undo_bar_delay_ms)
    }
}

/// Screen layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// List and reading pane take turns on screen.
    #[default]
    SinglePane,
    /// List and reading pane are visible together.
    MultiPane,
}

/// Local storage configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite database path. Defaults to `mailflow.db` in the data directory.
    pub database_path: Option<PathBuf>,
}

impl Settings {
    const FILE_NAME: &'static str = "settings.json";

    fn project_dirs() -> ConfigResult<ProjectDirs> {
        ProjectDirs::from("dev", "mailflow", "mailflow").ok_or(ConfigError::NoConfigDir)
    }

    /// Default location of the settings file.
    pub fn default_path() -> ConfigResult<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join(Self::FILE_NAME))
    }

    /// Database path from settings, or the platform data directory.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::project_dirs()?.data_dir().join("mailflow.db")),
        }
    }

    /// Loads settings from `path`, returning defaults when the file does not exist.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Loads settings from the default location.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(Self::default_path()?)
    }

    /// Writes settings to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.behavior.default_auto_advance, AutoAdvance::List);
        assert_eq!(settings.behavior.undo_bar_delay(), Duration::from_millis(500));
        assert_eq!(settings.behavior.layout, Layout::SinglePane);
        assert!(settings.storage.database_path.is_none());
    }

    #[test]
    fn layout_serialization() {
        assert_eq!(
            serde_json::to_string(&Layout::MultiPane).unwrap(),
            "\"multi_pane\""
        );
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn settings_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.behavior.layout = Layout::MultiPane;
        settings.behavior.undo_bar_delay_ms = 0;
        settings.storage.database_path = Some(dir.path().join("mail.db"));

        settings.save_to(&path).unwrap();
        let loaded = Settings::load_from(&path).unwrap();

        pretty_assertions::assert_eq!(loaded, settings);
    }

    #[test]
    fn load_from_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Settings::load_from(dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn load_from_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(Settings::load_from(&path), Err(ConfigError::Parse(_))));
    }
}
