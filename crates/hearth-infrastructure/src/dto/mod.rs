//! On-disk record formats.
//!
//! Domain types never touch disk directly. Each persisted record has
//! versioned DTOs here, conversions to and from the domain, and a migrator
//! factory registering its migration path.

mod conversation;
mod prompt_template;
mod settings;
mod state;

pub use conversation::{
    CONVERSATION_ENTITY, ConversationRecord, ConversationV1_0_0, TurnRecord,
    create_conversation_migrator,
};
pub use prompt_template::{
    PROMPT_TEMPLATES_ENTITY, PromptTemplateRecord, PromptTemplatesV1_0_0,
    create_prompt_templates_migrator,
};
pub use settings::{SETTINGS_ENTITY, SettingsV1_0_0, create_settings_migrator};
pub use state::{STATE_ENTITY, StateV1_0_0, create_state_migrator};
