// SPDX-License-Identifier: AGPL-3.0
// Phonebook Core - Settings persistence
//
// Settings are stored in a local JSON file next to the saved session.

use crate::types::{AppError, ClientSettings};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Resolve (and create) the per-user config directory
pub(crate) fn config_dir() -> Result<PathBuf, AppError> {
    let config_dir = directories::ProjectDirs::from("in", "signpost", "phonebook")
        .ok_or_else(|| AppError::FileIo("Could not determine config directory".to_string()))?
        .config_dir()
        .to_path_buf();

    fs::create_dir_all(&config_dir)
        .map_err(|e| AppError::FileIo(format!("Failed to create config dir: {}", e)))?;

    Ok(config_dir)
}

/// In-memory cache of settings, persisted to disk on changes
pub struct SettingsStore {
    settings: RwLock<ClientSettings>,
    file_path: PathBuf,
}

impl SettingsStore {
    /// Create a settings store backed by the default config directory
    pub fn new() -> Result<Self, AppError> {
        Self::with_path(config_dir()?.join("settings.json"))
    }

    /// Create a settings store backed by an explicit file
    pub fn with_path(file_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let file_path = file_path.into();
        tracing::info!("Settings file path: {:?}", file_path);

        let settings = if file_path.exists() {
            let content = fs::read_to_string(&file_path)
                .map_err(|e| AppError::FileIo(format!("Failed to read settings: {}", e)))?;

            serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse settings, using defaults: {}", e);
                ClientSettings::default()
            })
        } else {
            tracing::info!("No settings file found, using defaults");
            ClientSettings::default()
        };

        let store = Self {
            settings: RwLock::new(settings),
            file_path,
        };

        if !store.file_path.exists() {
            tracing::info!("Creating initial settings file");
            store.persist()?;
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn persist(&self) -> Result<(), AppError> {
        let settings = self.settings.read().unwrap_or_else(PoisonError::into_inner);

        let content = serde_json::to_string_pretty(&*settings)
            .map_err(|e| AppError::Serialization(format!("Failed to serialize settings: {}", e)))?;

        fs::write(&self.file_path, content)
            .map_err(|e| AppError::FileIo(format!("Failed to write settings: {}", e)))?;

        Ok(())
    }

    /// Get current settings
    pub fn get(&self) -> ClientSettings {
        self.settings.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Update settings and persist to disk
    pub fn update(&self, new_settings: ClientSettings) -> Result<(), AppError> {
        if new_settings.favorites_base_url.trim().is_empty() {
            return Err(AppError::InvalidConfig("Favorites URL cannot be empty".to_string()));
        }

        tracing::info!("Updating settings, favorites url: {}", new_settings.favorites_base_url);
        {
            let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
            *settings = new_settings;
        }

        let result = self.persist();
        if let Err(e) = &result {
            tracing::error!("Failed to persist settings: {}", e);
        }
        result
    }
}
