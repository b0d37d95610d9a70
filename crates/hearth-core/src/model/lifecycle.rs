use super::acquisition::ModelAcquisition;
use super::classify::classify_load_failure;
use super::config::{ConfigVariant, ModelConfig, ModelSettings};
use super::handle::ModelHandle;
use super::runtime::{LoadedModel, ModelRuntime, RuntimeError};
use crate::error::{ErrorKind, LoadError};
use crate::settings::SettingsStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "kind", rename_all = "snake_case")]
pub enum ModelState {
    Unloaded,
    Loading,
    Ready,
    /// Recoverable only by another `ensure_ready` call.
    Error(ErrorKind),
}

/// Snapshot published on every state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub state: ModelState,
    pub message: String,
    pub path: Option<PathBuf>,
}

impl ModelStatus {
    fn new(state: ModelState, message: impl Into<String>, path: Option<&Path>) -> Self {
        Self {
            state,
            message: message.into(),
            path: path.map(Path::to_path_buf),
        }
    }
}

/// Owns the active [`ModelHandle`], if any.
///
/// # Lifecycle
///
/// `Unloaded -> Loading -> Ready`; `Ready -> Loading` on a swap; any state
/// `-> Error(kind)` on failure. A swap retires the current handle first,
/// which cancels its in-flight run and waits for it to release the model.
///
/// # Path resolution
///
/// 1. The explicit path argument
/// 2. The saved custom path, if that file still exists
/// 3. The default model, fetched through [`ModelAcquisition`] when absent
///
/// Each load tries the full configuration first and the basic one second.
pub struct ModelLifecycleManager {
    runtime: Arc<dyn ModelRuntime>,
    acquisition: Arc<dyn ModelAcquisition>,
    settings_store: Arc<dyn SettingsStore>,
    model_settings: ModelSettings,
    slot: Mutex<Option<ModelHandle>>,
    status: watch::Sender<ModelStatus>,
}

impl ModelLifecycleManager {
    pub fn new(
        runtime: Arc<dyn ModelRuntime>,
        acquisition: Arc<dyn ModelAcquisition>,
        settings_store: Arc<dyn SettingsStore>,
        model_settings: ModelSettings,
    ) -> Self {
        let (status, _) = watch::channel(ModelStatus::new(
            ModelState::Unloaded,
            "No model loaded",
            None,
        ));
        Self {
            runtime,
            acquisition,
            settings_store,
            model_settings,
            slot: Mutex::new(None),
            status,
        }
    }

    pub fn state(&self) -> ModelState {
        self.status.borrow().state
    }

    pub fn status(&self) -> ModelStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every status transition.
    pub fn subscribe(&self) -> watch::Receiver<ModelStatus> {
        self.status.subscribe()
    }

    pub async fn current_handle(&self) -> Option<ModelHandle> {
        self.slot.lock().await.clone()
    }

    /// Whether a model is loaded or a loadable file is present on disk.
    /// Never fetches.
    pub async fn is_model_available(&self) -> bool {
        if self.slot.lock().await.is_some() {
            return true;
        }
        match self.settings_store.custom_model_path().await {
            Ok(Some(path)) if path.is_file() => return true,
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read custom model path"),
        }
        self.acquisition.default_model_path().is_file()
    }

    /// Returns a ready handle, loading or swapping the model as needed.
    ///
    /// Idempotent: with no explicit path, or the path of the active model,
    /// the active handle is returned unchanged.
    ///
    /// # Errors
    ///
    /// A classified [`LoadError`]. The manager is then in `Error(kind)` and
    /// holds no handle.
    pub async fn ensure_ready(&self, explicit_path: Option<&Path>) -> Result<ModelHandle, LoadError> {
        let mut slot = self.slot.lock().await;

        if let Some(current) = slot.as_ref() {
            match explicit_path {
                None => return Ok(current.clone()),
                Some(path) if path == current.path() => return Ok(current.clone()),
                Some(_) => {}
            }
        }

        if let Some(previous) = slot.take() {
            tracing::info!(path = %previous.path().display(), "Releasing current model for swap");
            previous.retire().await;
            self.publish(ModelStatus::new(
                ModelState::Unloaded,
                "Model released",
                Some(previous.path()),
            ));
        }

        let path = match self.resolve_path(explicit_path).await {
            Ok(path) => path,
            Err(e) => return Err(self.fail(e)),
        };
        if let Err(e) = self.check_file(&path) {
            return Err(self.fail(e));
        }

        self.publish(ModelStatus::new(
            ModelState::Loading,
            format!("Loading model: {}", file_label(&path)),
            Some(&path),
        ));

        let handle = match self.load_with_fallback(&path).await {
            Ok(handle) => handle,
            Err(e) => return Err(self.fail(e)),
        };

        tracing::info!(
            path = %path.display(),
            variant = ?handle.variant(),
            "Model loaded"
        );
        self.publish(ModelStatus::new(
            ModelState::Ready,
            format!("Model loaded and ready: {}", file_label(&path)),
            Some(&path),
        ));
        *slot = Some(handle.clone());
        Ok(handle)
    }

    /// Retires and drops the active handle, if any.
    pub async fn unload(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(previous) = slot.take() {
            previous.retire().await;
            tracing::info!(path = %previous.path().display(), "Model unloaded");
        }
        self.publish(ModelStatus::new(ModelState::Unloaded, "No model loaded", None));
    }

    async fn resolve_path(&self, explicit_path: Option<&Path>) -> Result<PathBuf, LoadError> {
        if let Some(path) = explicit_path {
            return Ok(path.to_path_buf());
        }

        match self.settings_store.custom_model_path().await {
            Ok(Some(path)) if path.is_file() => {
                tracing::debug!(path = %path.display(), "Using saved custom model path");
                return Ok(path);
            }
            Ok(Some(path)) => {
                tracing::warn!(
                    path = %path.display(),
                    "Saved custom model file no longer exists, using default model"
                );
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read custom model path"),
        }

        self.acquisition.ensure_local_model_file().await
    }

    fn check_file(&self, path: &Path) -> Result<(), LoadError> {
        if !path.exists() {
            return Err(LoadError::file_not_found(path));
        }
        if let Err(e) = std::fs::File::open(path) {
            return Err(LoadError::unreadable(
                path,
                format!("Cannot open model file: {e}"),
            ));
        }

        let validation = self.acquisition.validate_selected_file(path);
        if !validation.valid {
            let reason = validation
                .reason
                .unwrap_or_else(|| "Invalid model file".to_string());
            return Err(LoadError::unreadable(path, reason));
        }
        if let Some(warning) = validation.warning {
            tracing::warn!(path = %path.display(), "{}", warning);
        }
        Ok(())
    }

    async fn load_with_fallback(&self, path: &Path) -> Result<ModelHandle, LoadError> {
        let [full, basic] = ModelConfig::attempts(path, &self.model_settings);

        let primary = match self.load_blocking(full).await {
            Ok(model) => return Ok(ModelHandle::new(path.to_path_buf(), ConfigVariant::Full, model)),
            Err(e) => e,
        };
        tracing::warn!(
            error = %primary,
            "Full model configuration failed, retrying with basic configuration"
        );

        match self.load_blocking(basic).await {
            Ok(model) => Ok(ModelHandle::new(path.to_path_buf(), ConfigVariant::Basic, model)),
            Err(fallback) => {
                let kind = match classify_load_failure(&fallback) {
                    ErrorKind::Unknown => classify_load_failure(&primary),
                    kind => kind,
                };
                Err(LoadError::new(
                    kind,
                    Some(path.to_path_buf()),
                    format!(
                        "Failed to load model: {} (full configuration: {})",
                        fallback.message, primary.message
                    ),
                ))
            }
        }
    }

    async fn load_blocking(&self, config: ModelConfig) -> Result<Arc<dyn LoadedModel>, RuntimeError> {
        let runtime = self.runtime.clone();
        tokio::task::spawn_blocking(move || runtime.load(&config))
            .await
            .map_err(|e| RuntimeError::new(format!("model load task failed: {e}")))?
    }

    fn fail(&self, error: LoadError) -> LoadError {
        tracing::error!(
            kind = ?error.kind,
            path = ?error.path,
            "Model load failed: {}",
            error.message
        );
        self.publish(ModelStatus::new(
            ModelState::Error(error.kind),
            format!("{} {}", error.message, error.remediation_hint()),
            error.path.as_deref(),
        ));
        error
    }

    fn publish(&self, status: ModelStatus) {
        self.status.send_replace(status);
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as HearthResult;
    use crate::model::FileValidation;
    use crate::scripted::ScriptedRuntime;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    struct MockAcquisition {
        default_path: PathBuf,
    }

    #[async_trait]
    impl ModelAcquisition for MockAcquisition {
        fn default_model_path(&self) -> PathBuf {
            self.default_path.clone()
        }

        async fn ensure_local_model_file(&self) -> std::result::Result<PathBuf, LoadError> {
            if self.default_path.is_file() {
                Ok(self.default_path.clone())
            } else {
                Err(LoadError::file_not_found(&self.default_path))
            }
        }

        fn validate_selected_file(&self, path: &Path) -> FileValidation {
            match std::fs::read(path) {
                Ok(bytes) if bytes.starts_with(b"GGUF") => FileValidation::valid(),
                Ok(_) => FileValidation::invalid("Invalid GGUF file: missing GGUF magic"),
                Err(e) => FileValidation::invalid(e.to_string()),
            }
        }
    }

    #[derive(Default)]
    struct MockSettings {
        custom_path: StdMutex<Option<PathBuf>>,
    }

    #[async_trait]
    impl SettingsStore for MockSettings {
        async fn custom_model_path(&self) -> HearthResult<Option<PathBuf>> {
            Ok(self.custom_path.lock().unwrap().clone())
        }

        async fn set_custom_model_path(&self, path: Option<&Path>) -> HearthResult<()> {
            *self.custom_path.lock().unwrap() = path.map(Path::to_path_buf);
            Ok(())
        }

        async fn system_preamble(&self) -> HearthResult<Option<String>> {
            Ok(None)
        }

        async fn set_system_preamble(&self, _preamble: Option<&str>) -> HearthResult<()> {
            Ok(())
        }
    }

    struct Fixture {
        dir: TempDir,
        runtime: ScriptedRuntime,
        settings: Arc<MockSettings>,
        manager: ModelLifecycleManager,
    }

    impl Fixture {
        fn new(runtime: ScriptedRuntime) -> Self {
            let dir = TempDir::new().unwrap();
            let settings = Arc::new(MockSettings::default());
            let manager = ModelLifecycleManager::new(
                Arc::new(runtime.clone()),
                Arc::new(MockAcquisition {
                    default_path: dir.path().join("default.gguf"),
                }),
                settings.clone(),
                ModelSettings::default(),
            );
            Self {
                dir,
                runtime,
                settings,
                manager,
            }
        }

        fn model_file(&self, name: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, b"GGUF\x03\x00\x00\x00").unwrap();
            path
        }
    }

    #[tokio::test]
    async fn ensure_ready_is_idempotent() {
        let fx = Fixture::new(ScriptedRuntime::new());
        fx.model_file("default.gguf");

        let first = fx.manager.ensure_ready(None).await.unwrap();
        let second = fx.manager.ensure_ready(None).await.unwrap();

        assert!(first.same_model(&second));
        assert_eq!(fx.runtime.load_calls().len(), 1);
        assert_eq!(fx.manager.state(), ModelState::Ready);
        assert!(fx.manager.status().message.contains("default.gguf"));
    }

    #[tokio::test]
    async fn falls_back_to_basic_configuration() {
        let fx = Fixture::new(
            ScriptedRuntime::new().fail_loads([RuntimeError::new("unsupported gpu option")]),
        );
        let path = fx.model_file("model.gguf");

        let handle = fx.manager.ensure_ready(Some(&path)).await.unwrap();

        assert_eq!(handle.variant(), ConfigVariant::Basic);
        let calls = fx.runtime.load_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].variant, ConfigVariant::Full);
        assert_eq!(calls[1].variant, ConfigVariant::Basic);
        assert_eq!(calls[0].path, calls[1].path);
        assert_eq!(calls[1].gpu_layers, None);
    }

    #[tokio::test]
    async fn both_attempts_failing_classifies_and_enters_error_state() {
        let fx = Fixture::new(ScriptedRuntime::new().fail_loads([
            RuntimeError::new("ggml_cuda: out of memory"),
            RuntimeError::new("something unexpected"),
        ]));
        let path = fx.model_file("model.gguf");

        let err = fx.manager.ensure_ready(Some(&path)).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::OutOfMemory);
        assert_eq!(fx.manager.state(), ModelState::Error(ErrorKind::OutOfMemory));
        assert!(fx.manager.current_handle().await.is_none());
    }

    #[tokio::test]
    async fn missing_magic_is_unreadable_and_never_loads() {
        let fx = Fixture::new(ScriptedRuntime::new());
        let path = fx.dir.path().join("bad.gguf");
        std::fs::write(&path, b"NOPE").unwrap();

        let err = fx.manager.ensure_ready(Some(&path)).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::FileUnreadable);
        assert_eq!(fx.manager.state(), ModelState::Error(ErrorKind::FileUnreadable));
        assert!(fx.manager.current_handle().await.is_none());
        assert!(fx.runtime.load_calls().is_empty());
    }

    #[tokio::test]
    async fn missing_explicit_file_is_not_found() {
        let fx = Fixture::new(ScriptedRuntime::new());
        let path = fx.dir.path().join("absent.gguf");

        let err = fx.manager.ensure_ready(Some(&path)).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::FileNotFound);
    }

    #[tokio::test]
    async fn saved_custom_path_wins_over_default_while_it_exists() {
        let fx = Fixture::new(ScriptedRuntime::new());
        fx.model_file("default.gguf");
        let custom = fx.model_file("custom.gguf");
        fx.settings.set_custom_model_path(Some(&custom)).await.unwrap();

        let handle = fx.manager.ensure_ready(None).await.unwrap();
        assert_eq!(handle.path(), custom.as_path());

        fx.manager.unload().await;
        std::fs::remove_file(&custom).unwrap();

        let handle = fx.manager.ensure_ready(None).await.unwrap();
        assert_eq!(handle.path(), fx.dir.path().join("default.gguf").as_path());
    }

    #[tokio::test]
    async fn swap_retires_previous_handle() {
        let fx = Fixture::new(ScriptedRuntime::new());
        let first_path = fx.model_file("first.gguf");
        let second_path = fx.model_file("second.gguf");

        let first = fx.manager.ensure_ready(Some(&first_path)).await.unwrap();
        let token = first.run_token();
        let second = fx.manager.ensure_ready(Some(&second_path)).await.unwrap();

        assert!(first.is_retired());
        assert!(token.is_cancelled());
        assert!(!second.is_retired());
        assert_eq!(second.path(), second_path.as_path());
    }

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let fx = Fixture::new(ScriptedRuntime::new());
        let path = fx.model_file("model.gguf");
        let mut rx = fx.manager.subscribe();
        assert_eq!(rx.borrow_and_update().state, ModelState::Unloaded);

        fx.manager.ensure_ready(Some(&path)).await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().state, ModelState::Ready);
    }

    #[tokio::test]
    async fn availability_reflects_files_on_disk() {
        let fx = Fixture::new(ScriptedRuntime::new());
        assert!(!fx.manager.is_model_available().await);

        fx.model_file("default.gguf");
        assert!(fx.manager.is_model_available().await);
    }
}
