// shelfmark Settings Engine
// Loads, saves and edits `ShelfSettings`, stored as pretty JSON at the
// platform config path unless an explicit path is given.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::ShelfSettings;

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<ShelfSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &ShelfSettings;
    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
}

pub struct SettingsEngine {
    config_path: String,
    settings: ShelfSettings,
}

impl SettingsEngine {
    /// Creates an engine holding default settings.
    ///
    /// `path_override` replaces the platform config path when given.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = path_override.unwrap_or_else(|| {
            platform::default_settings_path()
                .to_string_lossy()
                .to_string()
        });
        Self {
            config_path,
            settings: ShelfSettings::default(),
        }
    }

    /// Database file to open: the configured path, else the platform default.
    pub fn database_path(&self) -> PathBuf {
        match self.settings.storage.database_path.as_deref() {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => platform::default_database_path(),
        }
    }
}

/// Walks `key` (dot separated) through `root` and replaces the leaf.
///
/// Only existing keys can be set.
fn replace_at_path(root: &mut Value, key: &str, value: Value) -> Result<(), SettingsError> {
    let not_found = || SettingsError::InvalidKey(format!("Key '{}' not found in settings", key));
    let (parents, leaf) = match key.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, key),
    };

    let mut current = root;
    for part in parents.into_iter().flat_map(|p| p.split('.')) {
        current = current.get_mut(part).ok_or_else(not_found)?;
    }
    match current {
        Value::Object(map) if map.contains_key(leaf) => {
            map.insert(leaf.to_string(), value);
            Ok(())
        }
        Value::Object(_) => Err(not_found()),
        _ => Err(SettingsError::InvalidKey(format!(
            "Cannot navigate to key '{}': intermediate value is not an object",
            key
        ))),
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads settings from disk. A missing file yields the defaults; a
    /// malformed one is a serialization error.
    fn load(&mut self) -> Result<ShelfSettings, SettingsError> {
        let path = Path::new(&self.config_path);
        if !path.exists() {
            debug!(path = %self.config_path, "no settings file, using defaults");
            self.settings = ShelfSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;
        self.settings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;
        Ok(self.settings.clone())
    }

    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;
        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))?;
        Ok(())
    }

    fn get_settings(&self) -> &ShelfSettings {
        &self.settings
    }

    /// Updates one setting by dot path, e.g. `feed.recent_limit`, and saves.
    ///
    /// The new value is checked by decoding the whole settings document.
    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        if key.trim().is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }

        let mut document = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;
        replace_at_path(&mut document, key, value)?;

        self.settings = serde_json::from_value(document).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;
        info!(key, "setting updated");
        self.save()
    }

    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = ShelfSettings::default();
        self.save()
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
