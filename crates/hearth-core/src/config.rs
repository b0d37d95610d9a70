//! Application configuration model.
//!
//! Every field has a default so a missing or partial `config.toml` still
//! produces a usable configuration. Loading and saving live in the
//! infrastructure crate.

use crate::generation::GenerationParameters;
use crate::model::ModelSettings;
use crate::template::ChatTemplate;
use serde::{Deserialize, Serialize};

/// Built-in system preamble used when neither the conversation nor the
/// settings store provide one.
pub const DEFAULT_PREAMBLE: &str =
    "You are a helpful AI assistant. Answer the user's questions politely and informatively.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub default_preamble: String,
    pub model: ModelSettings,
    pub generation: GenerationParameters,
    pub chat_template: ChatTemplate,
    pub session: SessionSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_preamble: DEFAULT_PREAMBLE.to_string(),
            model: ModelSettings::default(),
            generation: GenerationParameters::default(),
            chat_template: ChatTemplate::default(),
            session: SessionSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Auto-derived titles are cut to this many characters.
    pub title_max_chars: usize,
    /// Title of a conversation that has no user turn yet.
    pub default_title: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            title_max_chars: 40,
            default_title: "New conversation".to_string(),
        }
    }
}
