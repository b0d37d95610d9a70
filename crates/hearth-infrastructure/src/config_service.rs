//! Configuration service implementation.
//!
//! Loads [`AppConfig`] from `config.toml` in the config directory. A missing
//! or blank file yields the defaults; a malformed file is an error rather
//! than a silent fallback.

use crate::paths::HearthPaths;
use crate::storage::AtomicTomlFile;
use hearth_core::config::AppConfig;
use hearth_core::error::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Loads and caches the application configuration.
#[derive(Clone)]
pub struct ConfigService {
    file: Arc<AtomicTomlFile<AppConfig>>,
    cached: Arc<RwLock<Option<AppConfig>>>,
}

impl ConfigService {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicTomlFile::new(path)),
            cached: Arc::new(RwLock::new(None)),
        }
    }

    pub fn default_location(paths: &HearthPaths) -> Self {
        Self::new(paths.config_file())
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Returns the configuration, reading the file on first access.
    ///
    /// # Errors
    ///
    /// Returns a `Serialization` error if the file exists but is not valid
    /// configuration TOML.
    pub fn get_config(&self) -> Result<AppConfig> {
        if let Some(cached) = self
            .cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(cached.clone());
        }

        let loaded = match self.file.load()? {
            Some(config) => config,
            None => {
                tracing::debug!(path = %self.path().display(), "No config file, using defaults");
                AppConfig::default()
            }
        };
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(loaded.clone());
        Ok(loaded)
    }

    /// Writes the configuration and refreshes the cache.
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        self.file.save(config)?;
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(config.clone());
        Ok(())
    }

    /// Writes a default config file unless one exists. Returns whether a
    /// file was written.
    pub fn init(&self) -> Result<bool> {
        if self.path().exists() {
            return Ok(false);
        }
        self.save(&AppConfig::default())?;
        tracing::info!(path = %self.path().display(), "Wrote default configuration");
        Ok(true)
    }

    /// Forces a reload on next access.
    pub fn invalidate_cache(&self) {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
