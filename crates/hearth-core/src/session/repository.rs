//! Conversation repository trait.
//!
//! Defines the interface for conversation persistence operations.

use super::model::Conversation;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for persisting conversations and the
/// current-conversation pointer.
///
/// Each conversation is a self-contained record; implementations must make
/// `save` atomic so a crash never leaves a half-written record behind.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Finds a conversation by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Conversation))`: Conversation found
    /// - `Ok(None)`: Conversation not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, conversation_id: &str) -> Result<Option<Conversation>>;

    /// Saves a conversation, replacing any previous record with the same ID.
    async fn save(&self, conversation: &Conversation) -> Result<()>;

    /// Deletes a conversation. Deleting a missing conversation is not an error.
    async fn delete(&self, conversation_id: &str) -> Result<()>;

    /// Lists all stored conversations, most recently updated first.
    async fn list_all(&self) -> Result<Vec<Conversation>>;

    /// Gets the ID of the current conversation, if one is set.
    async fn get_current_id(&self) -> Result<Option<String>>;

    /// Sets the ID of the current conversation.
    async fn set_current_id(&self, conversation_id: &str) -> Result<()>;
}
