use super::message::Turn;
use super::model::{Conversation, derive_title};
use super::repository::ConversationRepository;
use crate::config::SessionSettings;
use crate::error::{HearthError, Result};
use crate::template::PromptTemplate;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Owns the set of persisted conversations and the current-conversation
/// pointer.
///
/// `SessionStore` is responsible for:
/// - Creating conversations (optionally seeded from a prompt template)
/// - Appending turns with persistence before acknowledgement
/// - Renaming, with auto-titling from the first user turn
/// - Deleting, moving the current pointer to a surviving conversation
///
/// Read-modify-write operations are serialised through an internal mutex so
/// two appends to the same conversation cannot lose each other's turns.
pub struct SessionStore {
    repository: Arc<dyn ConversationRepository>,
    settings: SessionSettings,
    write_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(repository: Arc<dyn ConversationRepository>, settings: SessionSettings) -> Self {
        Self {
            repository,
            settings,
            write_lock: Mutex::new(()),
        }
    }

    /// Lists all conversations, most recently updated first.
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let mut conversations = self.repository.list_all().await?;
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    /// Creates an empty conversation and makes it current.
    ///
    /// When a template is given its preamble and parameters are copied into
    /// the conversation, so later edits to the template do not rewrite it.
    pub async fn create_conversation(
        &self,
        template: Option<&PromptTemplate>,
    ) -> Result<Conversation> {
        let _guard = self.write_lock.lock().await;
        self.create_unlocked(template).await
    }

    async fn create_unlocked(&self, template: Option<&PromptTemplate>) -> Result<Conversation> {
        let mut conversation =
            Conversation::new(Uuid::new_v4().to_string(), self.settings.default_title.clone());
        if let Some(template) = template {
            conversation = conversation.seeded_from(template);
        }

        self.repository.save(&conversation).await?;
        self.repository.set_current_id(&conversation.id).await?;

        tracing::info!(
            conversation_id = %conversation.id,
            template = ?conversation.template_name,
            "Created conversation"
        );
        Ok(conversation)
    }

    /// Loads a conversation by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the conversation does not exist.
    pub async fn load_conversation(&self, conversation_id: &str) -> Result<Conversation> {
        self.repository
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| HearthError::not_found("conversation", conversation_id))
    }

    /// Appends one turn and persists the conversation before returning.
    pub async fn append_turn(&self, conversation_id: &str, turn: Turn) -> Result<Conversation> {
        self.append_turns(conversation_id, vec![turn]).await
    }

    /// Appends a completed user/assistant exchange in a single persisted write.
    pub async fn append_exchange(
        &self,
        conversation_id: &str,
        user_text: impl Into<String>,
        assistant_text: impl Into<String>,
    ) -> Result<Conversation> {
        self.append_turns(
            conversation_id,
            vec![Turn::user(user_text), Turn::assistant(assistant_text)],
        )
        .await
    }

    async fn append_turns(&self, conversation_id: &str, turns: Vec<Turn>) -> Result<Conversation> {
        let _guard = self.write_lock.lock().await;
        let mut conversation = self.load_conversation(conversation_id).await?;

        for turn in turns {
            conversation.push_turn(turn, self.settings.title_max_chars);
        }
        self.repository.save(&conversation).await?;

        tracing::debug!(
            conversation_id,
            turns = conversation.turns.len(),
            "Appended turns"
        );
        Ok(conversation)
    }

    /// Renames a conversation.
    ///
    /// `Some(title)` sets an explicit title and disables auto-titling. `None`
    /// (or a blank title) reverts to the title derived from the first user
    /// turn, or the default title when there is none yet.
    pub async fn rename_conversation(
        &self,
        conversation_id: &str,
        title: Option<String>,
    ) -> Result<Conversation> {
        let _guard = self.write_lock.lock().await;
        let mut conversation = self.load_conversation(conversation_id).await?;

        match title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
            Some(title) => {
                conversation.title = derive_title(&title, usize::MAX);
                conversation.title_is_custom = true;
            }
            None => {
                conversation.title = conversation
                    .auto_title(self.settings.title_max_chars)
                    .unwrap_or_else(|| self.settings.default_title.clone());
                conversation.title_is_custom = false;
            }
        }
        conversation.touch();

        self.repository.save(&conversation).await?;
        Ok(conversation)
    }

    /// Deletes a conversation.
    ///
    /// If it was the current conversation, the pointer moves to the most
    /// recently updated survivor, or to a freshly created empty conversation
    /// when none remain.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if self.repository.find_by_id(conversation_id).await?.is_none() {
            return Err(HearthError::not_found("conversation", conversation_id));
        }
        self.repository.delete(conversation_id).await?;
        tracing::info!(conversation_id, "Deleted conversation");

        let current = self.repository.get_current_id().await?;
        if current.as_deref() != Some(conversation_id) {
            return Ok(());
        }

        let mut remaining = self.repository.list_all().await?;
        remaining.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        match remaining.first() {
            Some(next) => self.repository.set_current_id(&next.id).await?,
            None => {
                self.create_unlocked(None).await?;
            }
        }
        Ok(())
    }

    /// Makes an existing conversation current.
    pub async fn select_conversation(&self, conversation_id: &str) -> Result<Conversation> {
        let conversation = self.load_conversation(conversation_id).await?;
        self.repository.set_current_id(conversation_id).await?;
        Ok(conversation)
    }

    pub async fn current_conversation_id(&self) -> Result<Option<String>> {
        self.repository.get_current_id().await
    }

    /// Returns the current conversation, restoring the last one on startup
    /// or creating a fresh conversation when the pointer is unset or stale.
    pub async fn current_or_create(&self) -> Result<Conversation> {
        if let Some(id) = self.repository.get_current_id().await? {
            if let Some(conversation) = self.repository.find_by_id(&id).await? {
                return Ok(conversation);
            }
            tracing::warn!(conversation_id = %id, "Current conversation pointer is stale");
        }
        self.create_conversation(None).await
    }
}
