//! Conversation turn executor

use super::traits::{IntentClassifier, KnowledgeStore, MessageSender, TurnHandler};
use super::InboundMessage;

use async_trait::async_trait;
use crate::intent::{capabilities_prompt, IntentAction};
use crate::replies;
use crate::session::{SessionState, SessionStore};
use crate::state_machine::{transition, PriorSession, Reply, SessionMutation, TurnInput};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// What happened during one turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    /// Text sent (or attempted) to the user
    pub reply: String,
    pub delivered: bool,
    /// `None` when the turn ended before touching the session
    pub session: Option<SessionMutation>,
    pub knowledge_persisted: bool,
    pub classification_failed: bool,
}

/// Generic orchestrator that can work with any knowledge, classifier and sender implementations
pub struct ConversationOrchestrator<K, C, S>
where
    K: KnowledgeStore + 'static,
    C: IntentClassifier + 'static,
    S: MessageSender + 'static,
{
    knowledge: K,
    classifier: C,
    sender: S,
    sessions: Arc<SessionStore>,
}

impl<K, C, S> ConversationOrchestrator<K, C, S>
where
    K: KnowledgeStore + 'static,
    C: IntentClassifier + 'static,
    S: MessageSender + 'static,
{
    pub fn new(knowledge: K, classifier: C, sender: S, sessions: Arc<SessionStore>) -> Self {
        Self {
            knowledge,
            classifier,
            sender,
            sessions,
        }
    }

    /// Run one turn end to end. Never fails; every error becomes a reply
    /// and a log record.
    pub async fn handle_turn(&self, inbound: InboundMessage) -> TurnReport {
        let span = tracing::info_span!(
            "turn",
            turn_id = %uuid::Uuid::new_v4(),
            user = %inbound.user_id
        );
        self.run_turn(inbound).instrument(span).await
    }

    async fn run_turn(&self, inbound: InboundMessage) -> TurnReport {
        let started = Instant::now();
        let input = TurnInput::new(inbound.user_id, inbound.text, inbound.display_name);

        let context = match self
            .knowledge
            .retrieve_relevant_knowledge(&input.user_id, &input.message)
            .await
        {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!(error = %e, "Knowledge retrieval failed, continuing without context");
                String::new()
            }
        };

        let outcome = match self.classifier.classify(&input.message, &context).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Intent classification failed");
                let delivered = self
                    .deliver(&input.user_id, replies::CLASSIFIER_UNAVAILABLE)
                    .await;
                return TurnReport {
                    reply: replies::CLASSIFIER_UNAVAILABLE.to_string(),
                    delivered,
                    session: None,
                    knowledge_persisted: false,
                    classification_failed: true,
                };
            }
        };

        if let IntentAction::Other(action) = outcome.kind() {
            tracing::warn!(action = %action, "Classifier returned an unhandled action");
        }

        let prior = PriorSession::new(
            self.sessions.take_unknown_clarification(&input.user_id),
            matches!(
                self.sessions.get(&input.user_id),
                SessionState::AwaitingExpenseClarification
            ),
        );
        tracing::info!(
            action = %outcome.action,
            prior_unknown = prior.unknown_original.as_deref().unwrap_or(""),
            awaiting_expense = prior.awaiting_expense,
            "Intent classified"
        );

        let result = transition(&prior, &input, &outcome);

        match &result.new_session {
            SessionMutation::Set(state) => {
                tracing::debug!(session = %state.tag(), "Session armed");
                self.sessions.set(&input.user_id, state.clone());
            }
            SessionMutation::Clear => self.sessions.delete(&input.user_id),
        }

        if let Some(expense) = &result.expense {
            tracing::info!(
                amount = expense.amount,
                category = %expense.category,
                created_at = %expense.created_at,
                "Expense recorded"
            );
        }

        let reply = match &result.reply {
            Reply::Text(text) => text.clone(),
            Reply::CapabilitiesFallback { message } => self.capabilities_reply(message).await,
        };
        let delivered = self.deliver(&input.user_id, &reply).await;

        let knowledge_persisted = match result.knowledge {
            Some(entry) => match self.knowledge.save_knowledge(entry).await {
                Ok(_) => true,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to persist learned context");
                    false
                }
            },
            None => false,
        };

        tracing::info!(
            action = %outcome.action,
            delivered,
            knowledge_persisted,
            armed = result.new_session.is_armed(),
            duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Turn complete"
        );

        TurnReport {
            reply,
            delivered,
            session: Some(result.new_session),
            knowledge_persisted,
            classification_failed: false,
        }
    }

    /// Ask the classifier to explain what the assistant can do
    async fn capabilities_reply(&self, message: &str) -> String {
        match self.classifier.classify(&capabilities_prompt(message), "").await {
            Ok(outcome) if outcome.is_actionable() => outcome
                .error
                .unwrap_or_else(|| replies::FALLBACK_CANNED.to_string()),
            Ok(_) => replies::FALLBACK_CANNED.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Capabilities fallback failed, using canned reply");
                replies::FALLBACK_CANNED.to_string()
            }
        }
    }

    async fn deliver(&self, to: &str, text: &str) -> bool {
        match self.sender.send(to, text).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Failed to send reply");
                false
            }
        }
    }
}

#[async_trait]
impl<K, C, S> TurnHandler for ConversationOrchestrator<K, C, S>
where
    K: KnowledgeStore + 'static,
    C: IntentClassifier + 'static,
    S: MessageSender + 'static,
{
    async fn handle_turn(&self, inbound: InboundMessage) -> TurnReport {
        ConversationOrchestrator::handle_turn(self, inbound).await
    }

    fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}
