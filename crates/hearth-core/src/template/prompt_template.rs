use crate::error::Result;
use crate::generation::GenerationParameters;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A named, reusable bundle of system text and sampling parameters used to
/// seed new conversations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    pub system_text: String,
    #[serde(default)]
    pub parameters: GenerationParameters,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, system_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_text: system_text.into(),
            parameters: GenerationParameters::default(),
        }
    }

    pub fn with_parameters(mut self, parameters: GenerationParameters) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Persistence for prompt templates. Templates are keyed by name.
#[async_trait]
pub trait PromptTemplateRepository: Send + Sync {
    /// Lists all templates in name order.
    async fn list_all(&self) -> Result<Vec<PromptTemplate>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<PromptTemplate>>;

    /// Inserts the template or replaces the one with the same name.
    async fn save(&self, template: &PromptTemplate) -> Result<()>;

    /// Removes the template. Missing names are not an error.
    async fn delete(&self, name: &str) -> Result<()>;
}
