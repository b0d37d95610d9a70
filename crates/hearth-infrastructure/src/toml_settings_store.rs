//! TOML-based SettingsStore implementation

use crate::dto::{SETTINGS_ENTITY, create_settings_migrator};
use crate::paths::HearthPaths;
use crate::storage::VersionedTomlFile;
use async_trait::async_trait;
use hearth_core::error::Result;
use hearth_core::settings::{SettingsStore, UserSettings};
use std::path::{Path, PathBuf};

pub struct TomlSettingsStore {
    file: VersionedTomlFile<UserSettings>,
}

impl TomlSettingsStore {
    pub fn default_location(paths: &HearthPaths) -> Self {
        Self::with_path(paths.settings_file())
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            file: VersionedTomlFile::new(path, SETTINGS_ENTITY, create_settings_migrator),
        }
    }

    fn record(&self) -> Result<UserSettings> {
        Ok(self.file.load()?.unwrap_or_default())
    }
}

#[async_trait]
impl SettingsStore for TomlSettingsStore {
    async fn custom_model_path(&self) -> Result<Option<PathBuf>> {
        Ok(self.record()?.custom_model_path)
    }

    async fn set_custom_model_path(&self, path: Option<&Path>) -> Result<()> {
        self.file.update(|settings| {
            settings.custom_model_path = path.map(Path::to_path_buf);
        })?;
        tracing::info!(path = ?path, "Saved custom model path");
        Ok(())
    }

    async fn system_preamble(&self) -> Result<Option<String>> {
        Ok(self
            .record()?
            .system_preamble
            .filter(|p| !p.trim().is_empty()))
    }

    async fn set_system_preamble(&self, preamble: Option<&str>) -> Result<()> {
        let preamble = preamble.map(str::trim).filter(|p| !p.is_empty());
        self.file.update(|settings| {
            settings.system_preamble = preamble.map(str::to_string);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fresh_store_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = TomlSettingsStore::with_path(temp_dir.path().join("settings.toml"));

        assert!(store.custom_model_path().await.unwrap().is_none());
        assert!(store.system_preamble().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_values_persist_independently() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.toml");
        let store = TomlSettingsStore::with_path(path.clone());

        store
            .set_custom_model_path(Some(Path::new("/models/custom.gguf")))
            .await
            .unwrap();
        store.set_system_preamble(Some("Be terse.")).await.unwrap();

        let reopened = TomlSettingsStore::with_path(path);
        assert_eq!(
            reopened.custom_model_path().await.unwrap(),
            Some(PathBuf::from("/models/custom.gguf"))
        );
        assert_eq!(
            reopened.system_preamble().await.unwrap().as_deref(),
            Some("Be terse.")
        );

        reopened.set_custom_model_path(None).await.unwrap();
        assert!(reopened.custom_model_path().await.unwrap().is_none());
        assert!(reopened.system_preamble().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_settings_file_without_preamble_loads() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.toml");
        std::fs::write(&path, "version = \"1.0.0\"\ncustom_model_path = \"/m/a.gguf\"\n").unwrap();
        let store = TomlSettingsStore::with_path(path);

        assert_eq!(
            store.custom_model_path().await.unwrap(),
            Some(PathBuf::from("/m/a.gguf"))
        );
        assert!(store.system_preamble().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_preamble_clears_override() {
        let temp_dir = TempDir::new().unwrap();
        let store = TomlSettingsStore::with_path(temp_dir.path().join("settings.toml"));
        store.set_system_preamble(Some("x")).await.unwrap();

        store.set_system_preamble(Some("   ")).await.unwrap();

        assert!(store.system_preamble().await.unwrap().is_none());
    }
}
