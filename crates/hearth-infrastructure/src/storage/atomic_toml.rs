//! Crash-safe TOML files.
//!
//! Every record Hearth persists (a conversation, the template list, settings,
//! the current-conversation pointer, the app config) goes through
//! [`AtomicTomlFile`], so a crash mid-write leaves either the old or the new
//! content on disk, never a torn file.

use hearth_core::HearthError;
use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtomicTomlError {
    #[error("I/O error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error in {}: {}", .path.display(), .source)]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Lock error: {0}")]
    Lock(String),
}

impl From<AtomicTomlError> for HearthError {
    fn from(err: AtomicTomlError) -> Self {
        match err {
            AtomicTomlError::Io { path, source } => {
                HearthError::io(format!("{}: {}", path.display(), source))
            }
            AtomicTomlError::Parse { path, source } => HearthError::Serialization {
                format: "TOML".to_string(),
                message: format!("{}: {}", path.display(), source),
            },
            AtomicTomlError::Serialize(e) => e.into(),
            AtomicTomlError::Lock(message) => HearthError::io(message),
        }
    }
}

/// A handle to a TOML file with atomic replace semantics.
///
/// Provides:
/// - **Atomicity**: updates are all-or-nothing via tmp file + rename
/// - **Isolation**: [`lock`](Self::lock) guards read-modify-write cycles
/// - **Durability**: explicit fsync before rename
pub struct AtomicTomlFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicTomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and deserializes the file.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(T))`: loaded
    /// - `Ok(None)`: the file does not exist or is blank
    /// - `Err`: the file could not be read or parsed
    pub fn load(&self) -> Result<Option<T>, AtomicTomlError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        toml::from_str(&content)
            .map(Some)
            .map_err(|source| AtomicTomlError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    /// Serializes `data` and atomically replaces the file.
    pub fn save(&self, data: &T) -> Result<(), AtomicTomlError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let toml_string = toml::to_string_pretty(data)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path).map_err(|e| self.io_error(e))?;
        tmp_file
            .write_all(toml_string.as_bytes())
            .map_err(|e| self.io_error(e))?;
        tmp_file.sync_all().map_err(|e| self.io_error(e))?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }

    /// Takes the exclusive `<file>.lock` used to serialize read-modify-write
    /// cycles. Released when the guard drops.
    pub fn lock(&self) -> Result<FileLock, AtomicTomlError> {
        FileLock::acquire(&self.path)
    }

    /// Deletes the file. A missing file is not an error.
    pub fn remove(&self) -> Result<(), AtomicTomlError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn temp_path(&self) -> Result<PathBuf, AtomicTomlError> {
        let invalid = |message: &str| {
            self.io_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                message.to_string(),
            ))
        };
        let parent = self
            .path
            .parent()
            .ok_or_else(|| invalid("path has no parent directory"))?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| invalid("path has no file name"))?;

        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }

    fn io_error(&self, source: std::io::Error) -> AtomicTomlError {
        AtomicTomlError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Exclusive lock on `<file>.lock`, released on drop.
pub struct FileLock {
    _file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, AtomicTomlError> {
        let lock_path = path.with_extension("lock");
        let io = |source| AtomicTomlError::Io {
            path: lock_path.clone(),
            source,
        };

        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(io)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(io)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| AtomicTomlError::Lock(format!("Failed to acquire lock: {}", e)))?;
        }

        Ok(FileLock {
            _file: file,
            lock_path,
        })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}
