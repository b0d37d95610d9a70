//! TOML-based ConversationRepository implementation

use crate::dto::{
    CONVERSATION_ENTITY, STATE_ENTITY, create_conversation_migrator, create_state_migrator,
};
use crate::paths::HearthPaths;
use crate::storage::VersionedTomlFile;
use async_trait::async_trait;
use hearth_core::error::{HearthError, Result};
use hearth_core::session::{Conversation, ConversationRepository, SessionState};
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each conversation as its own TOML file.
///
/// ```text
/// base_dir/
/// ├── conversations/
/// │   ├── <conversation-id-1>.toml
/// │   └── <conversation-id-2>.toml
/// └── state.toml
/// ```
///
/// Records are self-contained; the only link between files is the current
/// conversation ID held in `state.toml`. Both kinds of file are versioned
/// and migrated on load.
pub struct TomlConversationRepository {
    conversations_dir: PathBuf,
    state: VersionedTomlFile<SessionState>,
}

impl TomlConversationRepository {
    /// Creates the repository, creating `conversations/` if needed.
    ///
    /// # Errors
    ///
    /// Returns an `Io` error if the directory cannot be created.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        Self::with_paths(base_dir.join("conversations"), base_dir.join("state.toml"))
    }

    /// Creates the repository at the standard data location.
    pub fn default_location(paths: &HearthPaths) -> Result<Self> {
        Self::with_paths(paths.conversations_dir(), paths.state_file())
    }

    fn with_paths(conversations_dir: PathBuf, state_file: PathBuf) -> Result<Self> {
        fs::create_dir_all(&conversations_dir)?;
        Ok(Self {
            conversations_dir,
            state: VersionedTomlFile::new(state_file, STATE_ENTITY, create_state_migrator),
        })
    }

    pub fn conversations_dir(&self) -> &Path {
        &self.conversations_dir
    }

    fn record_file(&self, conversation_id: &str) -> Result<VersionedTomlFile<Conversation>> {
        let valid = !conversation_id.is_empty()
            && conversation_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(HearthError::internal(format!(
                "Invalid conversation id: {conversation_id:?}"
            )));
        }
        Ok(Self::conversation_file(
            self.conversations_dir.join(format!("{conversation_id}.toml")),
        ))
    }

    fn conversation_file(path: PathBuf) -> VersionedTomlFile<Conversation> {
        VersionedTomlFile::new(path, CONVERSATION_ENTITY, create_conversation_migrator)
    }
}

#[async_trait]
impl ConversationRepository for TomlConversationRepository {
    async fn find_by_id(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        self.record_file(conversation_id)?.load()
    }

    async fn save(&self, conversation: &Conversation) -> Result<()> {
        self.record_file(&conversation.id)?.save(conversation)
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        self.record_file(conversation_id)?.remove()
    }

    async fn list_all(&self) -> Result<Vec<Conversation>> {
        let mut conversations = Vec::new();

        for entry in fs::read_dir(&self.conversations_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("toml") {
                continue;
            }

            match Self::conversation_file(path.clone()).load() {
                Ok(Some(conversation)) => conversations.push(conversation),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable conversation file");
                }
            }
        }

        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    async fn get_current_id(&self) -> Result<Option<String>> {
        Ok(self
            .state
            .load()?
            .and_then(|state| state.current_conversation_id))
    }

    async fn set_current_id(&self, conversation_id: &str) -> Result<()> {
        self.state.update(|state| {
            state.current_conversation_id = Some(conversation_id.to_string());
        })
    }
}
