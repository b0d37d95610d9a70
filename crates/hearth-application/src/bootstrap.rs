//! Composition root.
//!
//! Resolves the on-disk layout, reads the configuration and builds the
//! stores every front end shares. Model loading is not part of this step,
//! so management commands work without a model runtime.

use hearth_core::config::AppConfig;
use hearth_core::error::Result;
use hearth_core::model::ModelAcquisition;
use hearth_core::session::SessionStore;
use hearth_core::settings::SettingsStore;
use hearth_core::template::PromptTemplateRepository;
use hearth_infrastructure::{
    ConfigService, HearthPaths, LocalModelAcquisition, ModelFetcher, TomlConversationRepository,
    TomlPromptTemplateRepository, TomlSettingsStore,
};
use std::sync::Arc;

/// Shared, persistence-backed services.
#[derive(Clone)]
pub struct Services {
    pub paths: HearthPaths,
    pub config: AppConfig,
    pub config_service: ConfigService,
    pub session_store: Arc<SessionStore>,
    pub templates: Arc<dyn PromptTemplateRepository>,
    pub settings: Arc<dyn SettingsStore>,
    pub acquisition: Arc<dyn ModelAcquisition>,
}

impl Services {
    /// Builds every store under `paths`.
    ///
    /// # Arguments
    ///
    /// * `paths` - Directory layout (platform default or a custom root)
    /// * `fetcher` - Transfer used when the default model file is absent
    ///
    /// # Errors
    ///
    /// Fails if the configuration file is malformed or the data directories
    /// cannot be created.
    pub fn load(paths: HearthPaths, fetcher: Arc<dyn ModelFetcher>) -> Result<Self> {
        let config_service = ConfigService::default_location(&paths);
        let config = config_service.get_config()?;
        tracing::info!(
            "[Bootstrap] Configuration loaded from {}",
            config_service.path().display()
        );

        let repository = TomlConversationRepository::default_location(&paths)?;
        tracing::info!(
            "[Bootstrap] Conversations stored in {}",
            repository.conversations_dir().display()
        );
        let session_store = Arc::new(SessionStore::new(
            Arc::new(repository),
            config.session.clone(),
        ));

        let acquisition =
            LocalModelAcquisition::default_location(&paths, &config.model, fetcher);
        tracing::debug!(
            "[Bootstrap] Default model path: {}",
            acquisition.default_model_path().display()
        );

        Ok(Self {
            templates: Arc::new(TomlPromptTemplateRepository::default_location(&paths)),
            settings: Arc::new(TomlSettingsStore::default_location(&paths)),
            acquisition: Arc::new(acquisition),
            session_store,
            config,
            config_service,
            paths,
        })
    }
}
