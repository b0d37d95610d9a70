//! TOML-based PromptTemplateRepository implementation

use crate::dto::{PROMPT_TEMPLATES_ENTITY, create_prompt_templates_migrator};
use crate::paths::HearthPaths;
use crate::storage::VersionedTomlFile;
use async_trait::async_trait;
use hearth_core::error::Result;
use hearth_core::template::{PromptTemplate, PromptTemplateRepository};
use std::path::PathBuf;

/// Keeps every prompt template in one `prompt_templates.toml` file.
///
/// Writes go through a locked read-modify-write so that concurrent saves of
/// different templates do not drop each other.
pub struct TomlPromptTemplateRepository {
    file: VersionedTomlFile<Vec<PromptTemplate>>,
}

impl TomlPromptTemplateRepository {
    pub fn default_location(paths: &HearthPaths) -> Self {
        Self::with_path(paths.prompt_templates_file())
    }

    /// Creates a repository backed by a custom file (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            file: VersionedTomlFile::new(
                path,
                PROMPT_TEMPLATES_ENTITY,
                create_prompt_templates_migrator,
            ),
        }
    }

    fn load_all(&self) -> Result<Vec<PromptTemplate>> {
        let mut templates = self.file.load()?.unwrap_or_default();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }
}

#[async_trait]
impl PromptTemplateRepository for TomlPromptTemplateRepository {
    async fn list_all(&self) -> Result<Vec<PromptTemplate>> {
        self.load_all()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<PromptTemplate>> {
        Ok(self.load_all()?.into_iter().find(|t| t.name == name))
    }

    async fn save(&self, template: &PromptTemplate) -> Result<()> {
        let replaced = self.file.update(|templates| {
            match templates.iter_mut().find(|t| t.name == template.name) {
                Some(existing) => {
                    *existing = template.clone();
                    true
                }
                None => {
                    templates.push(template.clone());
                    false
                }
            }
        })?;

        tracing::debug!(name = %template.name, replaced, "Saved prompt template");
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.file.update(|templates| templates.retain(|t| t.name != name))
    }
}
