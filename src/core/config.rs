use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::alerts::model::AlertRules;
use super::error::ConfigError;
use super::silence::SilenceState;

/// Persisted settings: one alert rule per trigger plus the silence window.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Settings {
    #[serde(flatten)]
    pub alerts: AlertRules,
    #[serde(default)]
    pub silence: SilenceState,
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(app_config_dir: PathBuf) -> Self {
        Self {
            config_path: app_config_dir.join("settings.json"),
        }
    }

    /// Use an explicit settings file instead of `settings.json` in a directory.
    pub fn with_file(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load settings, falling back to defaults when missing or unreadable.
    pub fn load(&self) -> Settings {
        if !self.config_path.exists() {
            return Settings::default();
        }
        match self.try_load() {
            Ok(settings) => settings,
            Err(err) => {
                log::warn!("[Doorbell] {:?}, using defaults", err);
                Settings::default()
            }
        }
    }

    pub fn try_load(&self) -> Result<Settings, ConfigError> {
        let content = fs::read_to_string(&self.config_path).map_err(|source| ConfigError::Read {
            path: self.config_path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: self.config_path.clone(),
            source,
        })
    }

    pub fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: self.config_path.clone(),
            source,
        };
        // Ensure directory exists
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.config_path, content).map_err(write_error)
    }
}
