//! `prompt_templates.toml` DTOs and migrations

use hearth_core::generation::GenerationParameters;
use hearth_core::template::PromptTemplate;
use serde::{Deserialize, Serialize};
use version_migrate::{FromDomain, IntoDomain, MigrationError, Migrator, Versioned};

pub const PROMPT_TEMPLATES_ENTITY: &str = "prompt_templates";

/// Every saved template as a `[[template]]` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.0.0")]
pub struct PromptTemplatesV1_0_0 {
    #[serde(default, rename = "template")]
    pub templates: Vec<PromptTemplateRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplateRecord {
    pub name: String,
    pub system_text: String,
    #[serde(default)]
    pub parameters: GenerationParameters,
}

impl IntoDomain<Vec<PromptTemplate>> for PromptTemplatesV1_0_0 {
    fn into_domain(self) -> Vec<PromptTemplate> {
        self.templates
            .into_iter()
            .map(|record| {
                PromptTemplate::new(record.name, record.system_text)
                    .with_parameters(record.parameters)
            })
            .collect()
    }
}

impl FromDomain<Vec<PromptTemplate>> for PromptTemplatesV1_0_0 {
    fn from_domain(templates: Vec<PromptTemplate>) -> Self {
        Self {
            templates: templates
                .into_iter()
                .map(|template| PromptTemplateRecord {
                    name: template.name,
                    system_text: template.system_text,
                    parameters: template.parameters,
                })
                .collect(),
        }
    }
}

/// Creates the migrator for the template list.
///
/// The domain side is the whole list, so the file is loaded and saved as
/// one unit.
pub fn create_prompt_templates_migrator() -> Result<Migrator, MigrationError> {
    let mut migrator = Migrator::builder().build();
    let path = Migrator::define(PROMPT_TEMPLATES_ENTITY)
        .from::<PromptTemplatesV1_0_0>()
        .into_with_save::<Vec<PromptTemplate>>();
    migrator.register(path)?;
    Ok(migrator)
}
