//! Runtime for executing conversation turns
//!
//! One inbound message is one turn: context retrieval, classification, the
//! pure transition, then the session, reply and knowledge effects.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{ConversationOrchestrator, TurnReport};
pub use traits::*;

use crate::intent::LlmIntentClassifier;
use crate::knowledge::DatabaseKnowledgeStore;
use crate::messaging::WaSenderClient;

/// Type alias for the production orchestrator with concrete implementations
pub type ProductionOrchestrator =
    ConversationOrchestrator<DatabaseKnowledgeStore, LlmIntentClassifier, WaSenderClient>;

/// A decoded inbound chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Bare sender number, transport suffix already stripped
    pub user_id: String,
    pub text: String,
    pub display_name: String,
}

impl InboundMessage {
    pub fn new(
        user_id: impl Into<String>,
        text: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            display_name: display_name.into(),
        }
    }
}
