//! Unified path management for Hearth files.
//!
//! Every file location is derived here so that the repositories, the config
//! service, the model acquisition and logging agree on one layout.

use hearth_core::HearthError;
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "hearth";

/// Errors that can occur during path resolution.
#[derive(Error, Debug)]
pub enum PathError {
    #[error("Cannot find the platform {0} directory")]
    PlatformDirNotFound(&'static str),
}

impl From<PathError> for HearthError {
    fn from(err: PathError) -> Self {
        HearthError::config(err.to_string())
    }
}

/// Resolved directory layout.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/hearth/              # Config directory
/// ├── config.toml                # Application configuration
/// ├── settings.toml              # Custom model path, preamble override
/// ├── prompt_templates.toml      # Saved prompt templates
/// └── logs/
///     └── hearth.log.YYYY-MM-DD
///
/// ~/.local/share/hearth/         # Data directory
/// ├── state.toml                 # Current conversation pointer
/// ├── conversations/
/// │   └── <conversation-id>.toml
/// └── models/
///     └── llama-2-7b-chat.Q2_K.gguf
/// ```
///
/// With a custom root both directories collapse onto that root.
#[derive(Debug, Clone)]
pub struct HearthPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl HearthPaths {
    /// Resolves the layout.
    ///
    /// # Arguments
    ///
    /// * `custom_root` - Base directory replacing the platform directories
    ///   (portable installs, tests)
    ///
    /// # Errors
    ///
    /// Returns `PlatformDirNotFound` when no custom root is given and the
    /// platform directories cannot be determined.
    pub fn new(custom_root: Option<PathBuf>) -> Result<Self, PathError> {
        if let Some(root) = custom_root {
            return Ok(Self::rooted(root));
        }
        let config_dir = dirs::config_dir()
            .ok_or(PathError::PlatformDirNotFound("config"))?
            .join(APP_DIR);
        let data_dir = dirs::data_dir()
            .ok_or(PathError::PlatformDirNotFound("data"))?
            .join(APP_DIR);
        Ok(Self {
            config_dir,
            data_dir,
        })
    }

    /// Layout rooted at a single directory.
    pub fn rooted(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            config_dir: root.clone(),
            data_dir: root,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.toml")
    }

    pub fn prompt_templates_file(&self) -> PathBuf {
        self.config_dir.join("prompt_templates.toml")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.config_dir.join("logs")
    }

    pub fn state_file(&self) -> PathBuf {
        self.data_dir.join("state.toml")
    }

    pub fn conversations_dir(&self) -> PathBuf {
        self.data_dir.join("conversations")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.data_dir.join("models")
    }
}
