//! User settings that outlive a single conversation.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Choices the user makes at runtime, as one persisted unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub custom_model_path: Option<PathBuf>,
    pub system_preamble: Option<String>,
}

/// Persists the user's model choice and global preamble override.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn custom_model_path(&self) -> Result<Option<PathBuf>>;

    /// Stores a custom model path. `None` reverts to the default model.
    async fn set_custom_model_path(&self, path: Option<&Path>) -> Result<()>;

    async fn system_preamble(&self) -> Result<Option<String>>;

    /// Stores a preamble override. `None` reverts to the configured default.
    async fn set_system_preamble(&self, preamble: Option<&str>) -> Result<()>;
}
