use crate::error::LoadError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Result of checking a user-selected model file before it is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileValidation {
    pub valid: bool,
    /// Why the file was rejected.
    pub reason: Option<String>,
    /// Non-fatal concern, such as an unrecognised quantization.
    pub warning: Option<String>,
}

impl FileValidation {
    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
            warning: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
            warning: None,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }
}

/// Locates, fetches and validates model files on disk.
#[async_trait]
pub trait ModelAcquisition: Send + Sync {
    /// Where the default model lives once acquired.
    fn default_model_path(&self) -> PathBuf;

    /// Returns the default model path, fetching the file first if absent.
    ///
    /// # Errors
    ///
    /// Returns a `FileNotFound` load error when the file is absent and cannot
    /// be fetched.
    async fn ensure_local_model_file(&self) -> Result<PathBuf, LoadError>;

    /// Cheap structural check of a model file.
    fn validate_selected_file(&self, path: &Path) -> FileValidation;
}
