//! Conversation DTOs and migrations

use hearth_core::generation::GenerationParameters;
use hearth_core::session::{Conversation, Role, Turn};
use serde::{Deserialize, Serialize};
use version_migrate::{FromDomain, IntoDomain, MigrationError, Migrator, Versioned};

/// Migration path name for conversation files.
pub const CONVERSATION_ENTITY: &str = "conversation";

/// One conversation per file, self-contained.
///
/// Table-valued fields come last so the TOML stays flat and readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.0.0")]
pub struct ConversationV1_0_0 {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub title_is_custom: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<GenerationParameters>,
    #[serde(default, rename = "turn")]
    pub turns: Vec<TurnRecord>,
}

/// Latest conversation record version.
pub type ConversationRecord = ConversationV1_0_0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub role: Role,
    pub text: String,
    #[serde(default)]
    pub timestamp: String,
}

impl IntoDomain<Conversation> for ConversationV1_0_0 {
    fn into_domain(self) -> Conversation {
        Conversation {
            id: self.id,
            title: self.title,
            title_is_custom: self.title_is_custom,
            turns: self
                .turns
                .into_iter()
                .map(|turn| Turn {
                    role: turn.role,
                    text: turn.text,
                    timestamp: turn.timestamp,
                })
                .collect(),
            system_text: self.system_text,
            parameters: self.parameters,
            template_name: self.template_name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl FromDomain<Conversation> for ConversationV1_0_0 {
    fn from_domain(conversation: Conversation) -> Self {
        Self {
            id: conversation.id,
            title: conversation.title,
            title_is_custom: conversation.title_is_custom,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
            template_name: conversation.template_name,
            system_text: conversation.system_text,
            parameters: conversation.parameters,
            turns: conversation
                .turns
                .into_iter()
                .map(|turn| TurnRecord {
                    role: turn.role,
                    text: turn.text,
                    timestamp: turn.timestamp,
                })
                .collect(),
        }
    }
}

/// Creates the migrator for conversation files.
///
/// # Migration Path
///
/// - V1.0.0 → Conversation
pub fn create_conversation_migrator() -> Result<Migrator, MigrationError> {
    let mut migrator = Migrator::builder().build();
    let path = Migrator::define(CONVERSATION_ENTITY)
        .from::<ConversationV1_0_0>()
        .into_with_save::<Conversation>();
    migrator.register(path)?;
    Ok(migrator)
}
