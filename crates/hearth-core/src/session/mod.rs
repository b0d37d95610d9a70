//! Session domain module.
//!
//! # Module Structure
//!
//! - `message`: Turn types (`Role`, `Turn`)
//! - `model`: Conversation domain model (`Conversation`, `SessionState`)
//! - `repository`: Repository trait for conversation persistence
//! - `store`: Conversation lifecycle management (`SessionStore`)

mod message;
mod model;
mod repository;
mod store;

pub use message::{Role, Turn};
pub use model::{Conversation, SessionState, derive_title};
pub use repository::ConversationRepository;
pub use store::SessionStore;
