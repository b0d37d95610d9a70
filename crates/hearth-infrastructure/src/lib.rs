//! Persistence and adapters for Hearth.
//!
//! Implements the storage traits defined in `hearth-core` on top of TOML
//! files, resolves the on-disk layout, validates and acquires model files,
//! and bootstraps logging.

pub mod config_service;
pub mod dto;
pub mod logging;
pub mod model_file;
pub mod paths;
pub mod storage;
pub mod toml_conversation_repository;
pub mod toml_prompt_template_repository;
pub mod toml_settings_store;

pub use crate::config_service::ConfigService;
pub use crate::model_file::{LocalModelAcquisition, ModelFetcher, NoFetcher, validate_gguf_file};
pub use crate::paths::HearthPaths;
pub use crate::toml_conversation_repository::TomlConversationRepository;
pub use crate::toml_prompt_template_repository::TomlPromptTemplateRepository;
pub use crate::toml_settings_store::TomlSettingsStore;
