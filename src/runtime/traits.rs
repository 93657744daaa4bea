//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the orchestrator with mock implementations.
//! Production implementations live next to the code they wrap
//! ([`crate::knowledge`], [`crate::intent`], [`crate::messaging`]).

use super::{InboundMessage, TurnReport};
use crate::db::{KnowledgeEntry, NewKnowledgeEntry};
use crate::intent::{ClassificationError, IntentOutcome};
use crate::knowledge::PersistenceError;
use crate::messaging::TransportError;
use async_trait::async_trait;
use std::sync::Arc;

/// Append-only store of resolved clarification episodes
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Persist one entry; id and timestamp are assigned by the store
    async fn save_knowledge(
        &self,
        entry: NewKnowledgeEntry,
    ) -> Result<KnowledgeEntry, PersistenceError>;

    /// Render learned context for `user_id`, empty when there is none
    async fn retrieve_relevant_knowledge(
        &self,
        user_id: &str,
        current_query_hint: &str,
    ) -> Result<String, PersistenceError>;
}

/// Turns a message plus learned context into an intent
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(
        &self,
        message: &str,
        context: &str,
    ) -> Result<IntentOutcome, ClassificationError>;
}

/// Outbound chat transport
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, to: &str, text: &str) -> Result<(), TransportError>;
}

/// Entry point the HTTP layer hands decoded messages to
#[async_trait]
pub trait TurnHandler: Send + Sync {
    async fn handle_turn(&self, inbound: InboundMessage) -> TurnReport;

    /// Number of users currently waiting on a clarification
    fn active_sessions(&self) -> usize;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: KnowledgeStore + ?Sized> KnowledgeStore for Arc<T> {
    async fn save_knowledge(
        &self,
        entry: NewKnowledgeEntry,
    ) -> Result<KnowledgeEntry, PersistenceError> {
        (**self).save_knowledge(entry).await
    }

    async fn retrieve_relevant_knowledge(
        &self,
        user_id: &str,
        current_query_hint: &str,
    ) -> Result<String, PersistenceError> {
        (**self)
            .retrieve_relevant_knowledge(user_id, current_query_hint)
            .await
    }
}

#[async_trait]
impl<T: IntentClassifier + ?Sized> IntentClassifier for Arc<T> {
    async fn classify(
        &self,
        message: &str,
        context: &str,
    ) -> Result<IntentOutcome, ClassificationError> {
        (**self).classify(message, context).await
    }
}

#[async_trait]
impl<T: MessageSender + ?Sized> MessageSender for Arc<T> {
    async fn send(&self, to: &str, text: &str) -> Result<(), TransportError> {
        (**self).send(to, text).await
    }
}
