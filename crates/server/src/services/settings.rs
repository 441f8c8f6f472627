use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use thiserror::Error;

use crate::config::Config;
use crate::models::{Settings, UpdateSettings};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub struct SettingsService {
    settings_path: PathBuf,
    cache: RwLock<Settings>,
}

impl SettingsService {
    /// Initialize the settings service.
    /// Creates default settings file if it doesn't exist.
    pub async fn new(config: &Config) -> Result<Self, SettingsError> {
        Self::load(config.settings_path()).await
    }

    pub async fn load(settings_path: PathBuf) -> Result<Self, SettingsError> {
        let settings = Self::load_or_create(&settings_path).await?;

        Ok(Self {
            settings_path,
            cache: RwLock::new(settings),
        })
    }

    /// Load settings from file, or create with defaults if file doesn't exist.
    async fn load_or_create(path: &Path) -> Result<Settings, SettingsError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let settings: Settings = toml::from_str(&content)?;
                tracing::info!("Loaded settings from {}", path.display());
                Ok(settings)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }

                let default = Settings::default();
                let toml_str = toml::to_string_pretty(&default)?;
                tokio::fs::write(path, toml_str).await?;
                tracing::info!("Created default settings file at {}", path.display());
                Ok(default)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get current settings from cache (fast, no I/O).
    pub fn get(&self) -> Settings {
        self.cache.read().clone()
    }

    /// Update settings with partial data.
    /// Saves to file first, the cache only changes when the write succeeded.
    pub async fn update(&self, data: UpdateSettings) -> Result<Settings, SettingsError> {
        let new_settings = self.get().merge(data);

        self.save_to_file(&new_settings).await?;
        *self.cache.write() = new_settings.clone();

        Ok(new_settings)
    }

    /// Reset settings to defaults.
    pub async fn reset(&self) -> Result<Settings, SettingsError> {
        let default = Settings::default();

        self.save_to_file(&default).await?;
        *self.cache.write() = default.clone();

        Ok(default)
    }

    /// Save settings to TOML file atomically (write to temp, then rename).
    async fn save_to_file(&self, settings: &Settings) -> Result<(), SettingsError> {
        let toml_str = toml::to_string_pretty(settings)?;

        let tmp_path = self.settings_path.with_extension("toml.tmp");
        tokio::fs::write(&tmp_path, &toml_str).await?;
        tokio::fs::rename(&tmp_path, &self.settings_path).await?;

        tracing::debug!("Saved settings to {}", self.settings_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UpdateDownloadSettings;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("settings.toml");

        let service = SettingsService::load(path.clone()).await.unwrap();

        assert!(path.exists());
        assert_eq!(service.get(), Settings::default());
    }

    #[tokio::test]
    async fn test_update_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        let service = SettingsService::load(path.clone()).await.unwrap();

        service
            .update(UpdateSettings {
                download: Some(UpdateDownloadSettings {
                    enable_auto_download: Some(false),
                    enable_episode_count_same: None,
                }),
                ..Default::default()
            })
            .await
            .unwrap();

        let reloaded = SettingsService::load(path).await.unwrap();
        assert!(!reloaded.get().download.enable_auto_download);
        assert!(reloaded.get().download.enable_episode_count_same);
    }

    #[tokio::test]
    async fn test_reset_restores_defaults() {
        let dir = TempDir::new().unwrap();
        let service = SettingsService::load(dir.path().join("settings.toml"))
            .await
            .unwrap();
        service
            .update(UpdateSettings {
                download: Some(UpdateDownloadSettings {
                    enable_auto_download: Some(false),
                    enable_episode_count_same: Some(false),
                }),
                ..Default::default()
            })
            .await
            .unwrap();

        let settings = service.reset().await.unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(service.get(), Settings::default());
    }

    #[tokio::test]
    async fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "scrapers = 3").unwrap();

        assert!(matches!(
            SettingsService::load(path).await,
            Err(SettingsError::Parse(_))
        ));
    }
}
