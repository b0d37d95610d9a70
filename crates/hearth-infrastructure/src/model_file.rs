//! Local model files: GGUF validation and acquisition of the default model.

use crate::paths::HearthPaths;
use async_trait::async_trait;
use hearth_core::error::LoadError;
use hearth_core::model::{FileValidation, ModelAcquisition, ModelSettings};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// First four bytes of every GGUF file.
pub const GGUF_MAGIC: &[u8; 4] = b"GGUF";

/// File-name markers of quantizations known to load reliably.
pub const PREFERRED_QUANTIZATIONS: &[&str] = &["q4_0", "q4_1", "q5_0", "q5_k_m", "q6_k", "q8_0"];

const QUANTIZATION_WARNING: &str = "This model quantization may not be fully compatible. \
     Models with Q4_0, Q5_K_M or Q8_0 quantization are recommended.";

/// Checks extension and magic bytes; warns on unrecognised quantization.
///
/// Only the first four bytes are read.
pub fn validate_gguf_file(path: &Path) -> FileValidation {
    let has_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gguf"));
    if !has_extension {
        return FileValidation::invalid("File does not have a .gguf extension");
    }

    let mut magic = [0u8; 4];
    let read = File::open(path).and_then(|mut file| file.read_exact(&mut magic));
    match read {
        Ok(()) if &magic == GGUF_MAGIC => {}
        Ok(()) => {
            return FileValidation::invalid("Not a valid GGUF format file (missing GGUF header)");
        }
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return FileValidation::invalid("Not a valid GGUF format file (missing GGUF header)");
        }
        Err(e) => return FileValidation::invalid(format!("Error checking file: {e}")),
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if PREFERRED_QUANTIZATIONS
        .iter()
        .any(|quant| file_name.contains(quant))
    {
        FileValidation::valid()
    } else {
        FileValidation::valid().with_warning(QUANTIZATION_WARNING)
    }
}

/// Brings the default model file onto disk. The transfer itself (HTTP,
/// progress reporting) lives outside Hearth.
#[async_trait]
pub trait ModelFetcher: Send + Sync {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<(), LoadError>;
}

/// Fetcher for offline use: the default model must already be present.
pub struct NoFetcher;

#[async_trait]
impl ModelFetcher for NoFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<(), LoadError> {
        Err(LoadError::new(
            hearth_core::ErrorKind::FileNotFound,
            Some(destination.to_path_buf()),
            format!(
                "Model file not found at path: {}. Download it from {} and place it there.",
                destination.display(),
                url
            ),
        ))
    }
}

/// Model acquisition backed by the models directory.
pub struct LocalModelAcquisition {
    models_dir: PathBuf,
    file_name: String,
    download_url: String,
    fetcher: Arc<dyn ModelFetcher>,
}

impl LocalModelAcquisition {
    pub fn new(models_dir: PathBuf, settings: &ModelSettings, fetcher: Arc<dyn ModelFetcher>) -> Self {
        Self {
            models_dir,
            file_name: settings.file_name.clone(),
            download_url: settings.download_url.clone(),
            fetcher,
        }
    }

    pub fn default_location(
        paths: &HearthPaths,
        settings: &ModelSettings,
        fetcher: Arc<dyn ModelFetcher>,
    ) -> Self {
        Self::new(paths.models_dir(), settings, fetcher)
    }
}

#[async_trait]
impl ModelAcquisition for LocalModelAcquisition {
    fn default_model_path(&self) -> PathBuf {
        self.models_dir.join(&self.file_name)
    }

    async fn ensure_local_model_file(&self) -> Result<PathBuf, LoadError> {
        let path = self.default_model_path();
        if path.is_file() {
            return Ok(path);
        }

        tokio::fs::create_dir_all(&self.models_dir)
            .await
            .map_err(|e| LoadError::unreadable(&self.models_dir, format!("Cannot create models directory: {e}")))?;

        tracing::info!(url = %self.download_url, path = %path.display(), "Fetching default model");
        self.fetcher.fetch(&self.download_url, &path).await?;

        if !path.is_file() {
            return Err(LoadError::file_not_found(&path));
        }
        Ok(path)
    }

    fn validate_selected_file(&self, path: &Path) -> FileValidation {
        validate_gguf_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_preferred_quantization_is_valid_without_warning() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "mistral-7b.Q4_0.gguf", b"GGUF\x03\x00\x00\x00");

        assert_eq!(validate_gguf_file(&path), FileValidation::valid());
    }

    #[test]
    fn test_other_quantization_warns() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "llama-2-7b-chat.Q2_K.gguf", b"GGUF\x03\x00\x00\x00");

        let validation = validate_gguf_file(&path);

        assert!(validation.valid);
        assert!(validation.warning.is_some());
    }

    #[test]
    fn test_wrong_extension_or_magic_is_invalid() {
        let dir = TempDir::new().unwrap();
        let bin = write(&dir, "model.Q4_0.bin", b"GGUF");
        let bad_magic = write(&dir, "model.Q4_0.gguf", b"GGML\x00\x00");
        let short = write(&dir, "tiny.Q4_0.gguf", b"GG");

        assert!(!validate_gguf_file(&bin).valid);
        assert!(!validate_gguf_file(&bad_magic).valid);
        assert!(!validate_gguf_file(&short).valid);
    }

    struct WritingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelFetcher for WritingFetcher {
        async fn fetch(&self, _url: &str, destination: &Path) -> Result<(), LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::fs::write(destination, b"GGUF").unwrap();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_fetches_only_when_absent() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(WritingFetcher {
            calls: AtomicUsize::new(0),
        });
        let acquisition = LocalModelAcquisition::new(
            dir.path().join("models"),
            &ModelSettings::default(),
            fetcher.clone(),
        );

        let first = acquisition.ensure_local_model_file().await.unwrap();
        let second = acquisition.ensure_local_model_file().await.unwrap();

        assert_eq!(first, second);
        assert!(first.ends_with("llama-2-7b-chat.Q2_K.gguf"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_offline_fetcher_reports_file_not_found() {
        let dir = TempDir::new().unwrap();
        let acquisition = LocalModelAcquisition::new(
            dir.path().join("models"),
            &ModelSettings::default(),
            Arc::new(NoFetcher),
        );

        let err = acquisition.ensure_local_model_file().await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::FileNotFound);
    }
}
