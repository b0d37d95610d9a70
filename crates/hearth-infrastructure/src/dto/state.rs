//! `state.toml` DTOs

use hearth_core::session::SessionState;
use serde::{Deserialize, Serialize};
use version_migrate::{FromDomain, IntoDomain, MigrationError, Migrator, Versioned};

pub const STATE_ENTITY: &str = "state";

/// The current-conversation pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.0.0")]
pub struct StateV1_0_0 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_conversation_id: Option<String>,
}

impl IntoDomain<SessionState> for StateV1_0_0 {
    fn into_domain(self) -> SessionState {
        SessionState {
            current_conversation_id: self.current_conversation_id,
        }
    }
}

impl FromDomain<SessionState> for StateV1_0_0 {
    fn from_domain(state: SessionState) -> Self {
        Self {
            current_conversation_id: state.current_conversation_id,
        }
    }
}

pub fn create_state_migrator() -> Result<Migrator, MigrationError> {
    let mut migrator = Migrator::builder().build();
    let path = Migrator::define(STATE_ENTITY)
        .from::<StateV1_0_0>()
        .into_with_save::<SessionState>();
    migrator.register(path)?;
    Ok(migrator)
}
