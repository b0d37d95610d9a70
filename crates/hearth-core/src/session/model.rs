//! Conversation domain model.

use super::message::{Role, Turn};
use crate::generation::GenerationParameters;
use crate::template::PromptTemplate;
use serde::{Deserialize, Serialize};

/// An ordered, append-only sequence of turns plus its metadata.
///
/// This is the "pure" model the session logic operates on, independent of
/// the on-disk record format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier (UUID format)
    pub id: String,
    pub title: String,
    /// Set once the user renames the conversation; disables auto-titling.
    pub title_is_custom: bool,
    pub turns: Vec<Turn>,
    /// Conversation-scoped preamble seeded from a prompt template.
    pub system_text: Option<String>,
    /// Conversation-scoped parameters seeded from a prompt template.
    pub parameters: Option<GenerationParameters>,
    pub template_name: Option<String>,
    /// Timestamp when the conversation was created (RFC 3339)
    pub created_at: String,
    /// Timestamp when the conversation was last updated (RFC 3339)
    pub updated_at: String,
}

impl Conversation {
    pub fn new(id: impl Into<String>, default_title: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            title: default_title.into(),
            title_is_custom: false,
            turns: Vec::new(),
            system_text: None,
            parameters: None,
            template_name: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Copies the template's preamble and parameters into the conversation.
    pub fn seeded_from(mut self, template: &PromptTemplate) -> Self {
        self.system_text = Some(template.system_text.clone());
        self.parameters = Some(template.parameters.clone());
        self.template_name = Some(template.name.clone());
        self
    }

    pub fn first_user_turn(&self) -> Option<&Turn> {
        self.turns.iter().find(|t| t.role == Role::User)
    }

    /// Appends a turn, re-deriving the title when it is not custom.
    pub(crate) fn push_turn(&mut self, turn: Turn, title_max_chars: usize) {
        self.turns.push(turn);
        if !self.title_is_custom {
            if let Some(title) = self.auto_title(title_max_chars) {
                self.title = title;
            }
        }
        self.touch();
    }

    /// Title derived from the first user turn, if there is one.
    pub fn auto_title(&self, max_chars: usize) -> Option<String> {
        self.first_user_turn()
            .map(|turn| derive_title(&turn.text, max_chars))
            .filter(|title| !title.is_empty())
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Which conversation the app reopens on startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub current_conversation_id: Option<String>,
}

/// First line of `text`, whitespace-collapsed and cut to `max_chars`
/// characters with a trailing ellipsis when shortened.
pub fn derive_title(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let cut: String = collapsed.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
