//! Chat templates (delimiter vocabulary) and user-facing prompt templates.

mod chat;
mod prompt_template;

pub use chat::{ChatTemplate, CleanupRule};
pub use prompt_template::{PromptTemplate, PromptTemplateRepository};
