use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Model tuning from the `[model]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// File name of the default model inside the models directory.
    pub file_name: String,
    /// Where the default model is fetched from when absent.
    pub download_url: String,
    pub context_size: u32,
    pub batch_size: u32,
    pub gpu_layers: u32,
    pub seed: u32,
    pub use_mmap: bool,
    pub use_mlock: bool,
    pub f16_kv: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            file_name: "llama-2-7b-chat.Q2_K.gguf".to_string(),
            download_url:
                "https://creativetechnologies.s3.eu-west-2.amazonaws.com/LLM/Meta/llama-2-7b-chat.Q2_K.gguf"
                    .to_string(),
            context_size: 2048,
            batch_size: 512,
            gpu_layers: 0,
            seed: 42,
            use_mmap: true,
            use_mlock: false,
            f16_kv: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigVariant {
    /// All tuning parameters.
    Full,
    /// Only path, context and batch size; the runtime picks the rest.
    Basic,
}

/// Parameters for one load attempt. `None` leaves the runtime default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub variant: ConfigVariant,
    pub context_size: u32,
    pub batch_size: u32,
    pub gpu_layers: Option<u32>,
    pub seed: Option<u32>,
    pub use_mmap: Option<bool>,
    pub use_mlock: Option<bool>,
    pub f16_kv: Option<bool>,
}

impl ModelConfig {
    pub fn full(path: &Path, settings: &ModelSettings) -> Self {
        Self {
            path: path.to_path_buf(),
            variant: ConfigVariant::Full,
            context_size: settings.context_size,
            batch_size: settings.batch_size,
            gpu_layers: Some(settings.gpu_layers),
            seed: Some(settings.seed),
            use_mmap: Some(settings.use_mmap),
            use_mlock: Some(settings.use_mlock),
            f16_kv: Some(settings.f16_kv),
        }
    }

    pub fn basic(path: &Path, settings: &ModelSettings) -> Self {
        Self {
            path: path.to_path_buf(),
            variant: ConfigVariant::Basic,
            context_size: settings.context_size,
            batch_size: settings.batch_size,
            gpu_layers: None,
            seed: None,
            use_mmap: None,
            use_mlock: None,
            f16_kv: None,
        }
    }

    /// Load attempts in order: full tuning first, then the basic fallback.
    pub fn attempts(path: &Path, settings: &ModelSettings) -> [ModelConfig; 2] {
        [Self::full(path, settings), Self::basic(path, settings)]
    }
}
