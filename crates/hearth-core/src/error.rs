//! Error types for Hearth.
//!
//! Two layers live here: [`HearthError`], the shared error for storage,
//! configuration and orchestration, and the closed [`ErrorKind`] taxonomy that
//! callers branch on when a model load or a generation run fails.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Closed set of failure kinds surfaced to the UI layer.
///
/// `Cancelled` is listed for completeness: it is a normal terminal state of a
/// run and is never returned as an `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FileNotFound,
    FileUnreadable,
    IncompatibleQuantization,
    RuntimeVersionMismatch,
    OutOfMemory,
    GenerationBusy,
    GenerationFailed,
    Cancelled,
    Unknown,
}

impl ErrorKind {
    /// Human-readable remediation hint for a blocking status message.
    pub fn remediation_hint(self) -> &'static str {
        match self {
            Self::FileNotFound => {
                "The model file could not be found. Download the default model or select another file."
            }
            Self::FileUnreadable => {
                "The model file could not be read or is not a valid GGUF file. It may be corrupted or incomplete; download it again or select a different model."
            }
            Self::IncompatibleQuantization => {
                "This GGUF model appears to use an incompatible quantization. Try a different quantization format such as Q4_0 or Q5_K_M."
            }
            Self::RuntimeVersionMismatch => {
                "The model runtime is not compatible with this model file. Update the runtime or use a model produced for this version."
            }
            Self::OutOfMemory => {
                "Not enough memory to load the model. Try a smaller model or reduce the context size."
            }
            Self::GenerationBusy => "A response is already being generated. Wait for it to finish or cancel it.",
            Self::GenerationFailed => "Generation failed. The model is still loaded; try sending the message again.",
            Self::Cancelled => "Generation was cancelled.",
            Self::Unknown => "The model could not be loaded. Check the logs for details.",
        }
    }
}

/// Load-time failure kinds, a subset of [`ErrorKind`].
pub type LoadErrorKind = ErrorKind;

/// A classified failure to resolve, validate or load a model file.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct LoadError {
    pub kind: LoadErrorKind,
    pub path: Option<PathBuf>,
    pub message: String,
}

impl LoadError {
    pub fn new(kind: LoadErrorKind, path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
        }
    }

    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let message = format!("Model file not found at path: {}", path.display());
        Self::new(ErrorKind::FileNotFound, Some(path), message)
    }

    pub fn unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileUnreadable, Some(path.into()), reason)
    }

    pub fn remediation_hint(&self) -> &'static str {
        self.kind.remediation_hint()
    }
}

/// Failure of a single generation run.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationError {
    /// Another run currently holds the model handle.
    #[error("the model is busy with another generation")]
    Busy,
    /// The runtime failed while tokenizing or producing tokens.
    #[error("generation failed: {0}")]
    Failed(String),
    /// The handle was released by a model swap before the run could start.
    #[error("the model handle was released")]
    ModelRetired,
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Busy => ErrorKind::GenerationBusy,
            Self::Failed(_) | Self::ModelRetired => ErrorKind::GenerationFailed,
        }
    }
}

/// A shared error type for the entire Hearth application.
#[derive(Error, Debug, Clone)]
pub enum HearthError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stored record has a version this build cannot migrate
    #[error("Migration error: {0}")]
    Migration(String),

    /// Rejected caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model resolution or load failure
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Generation run failure
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HearthError {
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }

    pub fn is_migration(&self) -> bool {
        matches!(self, Self::Migration(_))
    }

    /// Taxonomy kind for model and generation failures, `None` otherwise.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Load(e) => Some(e.kind),
            Self::Generation(e) => Some(e.kind()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for HearthError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for HearthError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for HearthError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for HearthError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<version_migrate::MigrationError> for HearthError {
    fn from(err: version_migrate::MigrationError) -> Self {
        use version_migrate::MigrationError;

        match err {
            MigrationError::DeserializationError(_) | MigrationError::SerializationError(_) => {
                Self::Serialization {
                    format: "migration".to_string(),
                    message: err.to_string(),
                }
            }
            MigrationError::TomlParseError(_) | MigrationError::TomlSerializeError(_) => {
                Self::Serialization {
                    format: "TOML".to_string(),
                    message: err.to_string(),
                }
            }
            MigrationError::IoError { .. } => Self::Io {
                message: err.to_string(),
            },
            _ => Self::Migration(err.to_string()),
        }
    }
}

/// A type alias for `Result<T, HearthError>`.
pub type Result<T> = std::result::Result<T, HearthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_wraps_into_hearth_error_with_kind() {
        let err: HearthError = LoadError::file_not_found("/models/missing.gguf").into();
        assert_eq!(err.kind(), Some(ErrorKind::FileNotFound));
        assert!(err.to_string().contains("missing.gguf"));
    }

    #[test]
    fn busy_maps_to_generation_busy() {
        let err: HearthError = GenerationError::Busy.into();
        assert_eq!(err.kind(), Some(ErrorKind::GenerationBusy));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: HearthError = io.into();
        assert!(err.is_io());
        assert_eq!(err.kind(), None);
    }
}
