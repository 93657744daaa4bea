//! Mock implementations for testing
//!
//! These mocks enable orchestrator testing without real I/O.

use super::traits::*;
use crate::db::{KnowledgeEntry, NewKnowledgeEntry};
use crate::intent::{ClassificationError, IntentOutcome};
use crate::knowledge::{render_context, PersistenceError, RECENT_KNOWLEDGE_LIMIT};
use crate::messaging::TransportError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock Intent Classifier
// ============================================================================

/// Mock classifier that returns queued outcomes
///
/// An empty queue behaves like an unreachable model.
pub struct MockClassifier {
    responses: Mutex<VecDeque<Result<IntentOutcome, ClassificationError>>>,
    /// Record of all (message, context) pairs classified
    pub calls: Mutex<Vec<(String, String)>>,
}

#[allow(dead_code)]
impl MockClassifier {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful outcome
    pub fn queue_outcome(&self, outcome: IntentOutcome) {
        self.responses.lock().unwrap().push_back(Ok(outcome));
    }

    /// Queue a classification failure
    pub fn queue_error(&self, error: ClassificationError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded calls
    pub fn recorded_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntentClassifier for MockClassifier {
    async fn classify(
        &self,
        message: &str,
        context: &str,
    ) -> Result<IntentOutcome, ClassificationError> {
        self.calls
            .lock()
            .unwrap()
            .push((message.to_string(), context.to_string()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClassificationError::Timeout(Duration::from_secs(30))))
    }
}

// ============================================================================
// Mock Knowledge Store
// ============================================================================

/// In-memory knowledge store
pub struct MockKnowledgeStore {
    entries: Mutex<Vec<KnowledgeEntry>>,
    fail: AtomicBool,
}

#[allow(dead_code)]
impl MockKnowledgeStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Pre-populate an entry as if saved earlier
    pub fn seed(&self, entry: NewKnowledgeEntry) {
        self.push(entry);
    }

    /// Get all saved entries, oldest first
    pub fn saved(&self) -> Vec<KnowledgeEntry> {
        self.entries.lock().unwrap().clone()
    }

    fn push(&self, entry: NewKnowledgeEntry) -> KnowledgeEntry {
        let mut entries = self.entries.lock().unwrap();
        let saved = KnowledgeEntry {
            id: i64::try_from(entries.len()).unwrap() + 1,
            user_id: entry.user_id,
            original_query: entry.original_query,
            clarification_query: entry.clarification_query,
            resulting_action: entry.resulting_action,
            resulting_parameters: entry.resulting_parameters,
            timestamp: Utc::now(),
        };
        entries.push(saved.clone());
        saved
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(PersistenceError::Timeout(Duration::from_secs(5)))
        } else {
            Ok(())
        }
    }
}

impl Default for MockKnowledgeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeStore for MockKnowledgeStore {
    async fn save_knowledge(
        &self,
        entry: NewKnowledgeEntry,
    ) -> Result<KnowledgeEntry, PersistenceError> {
        self.check()?;
        Ok(self.push(entry))
    }

    async fn retrieve_relevant_knowledge(
        &self,
        user_id: &str,
        _current_query_hint: &str,
    ) -> Result<String, PersistenceError> {
        self.check()?;
        let newest_first: Vec<_> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .take(RECENT_KNOWLEDGE_LIMIT)
            .cloned()
            .collect();
        Ok(render_context(&newest_first))
    }
}

// ============================================================================
// Mock Message Sender
// ============================================================================

/// Sender that records every message
pub struct MockSender {
    fail: AtomicBool,
    /// Record of (recipient, text) pairs, including failed attempts
    pub sent: Mutex<Vec<(String, String)>>,
}

#[allow(dead_code)]
impl MockSender {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn recorded_sends(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for MockSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageSender for MockSender {
    async fn send(&self, to: &str, text: &str) -> Result<(), TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), text.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Parameters;
    use crate::intent::{ACTION_ADD_EXPENSE, ACTION_SHOW_MENU, ACTION_UNKNOWN};
    use crate::llm::LlmError;
    use crate::replies;
    use crate::runtime::{ConversationOrchestrator, InboundMessage};
    use crate::session::{SessionState, SessionStore};
    use crate::state_machine::SessionMutation;
    use std::sync::Arc;

    const USER: &str = "5511999999999";

    type TestOrchestrator =
        ConversationOrchestrator<Arc<MockKnowledgeStore>, Arc<MockClassifier>, Arc<MockSender>>;

    struct Harness {
        orchestrator: TestOrchestrator,
        knowledge: Arc<MockKnowledgeStore>,
        classifier: Arc<MockClassifier>,
        sender: Arc<MockSender>,
        sessions: Arc<SessionStore>,
    }

    fn harness() -> Harness {
        let knowledge = Arc::new(MockKnowledgeStore::new());
        let classifier = Arc::new(MockClassifier::new());
        let sender = Arc::new(MockSender::new());
        let sessions = Arc::new(SessionStore::new());
        let orchestrator = ConversationOrchestrator::new(
            knowledge.clone(),
            classifier.clone(),
            sender.clone(),
            sessions.clone(),
        );
        Harness {
            orchestrator,
            knowledge,
            classifier,
            sender,
            sessions,
        }
    }

    fn message(text: &str) -> InboundMessage {
        InboundMessage::new(USER, text, "Ana")
    }

    fn expense(amount: &str, category: &str) -> IntentOutcome {
        IntentOutcome::new(ACTION_ADD_EXPENSE)
            .with_param("amount", amount)
            .with_param("category", category)
    }

    #[tokio::test]
    async fn test_expense_from_idle_user() {
        let h = harness();
        h.classifier.queue_outcome(expense("100,50", "Lazer "));

        let report = h
            .orchestrator
            .handle_turn(message("gastei 100,50 em lazer"))
            .await;

        assert_eq!(
            report.reply,
            "✅ Despesa de R$100.50 na categoria 'Lazer' adicionada com sucesso!"
        );
        assert!(report.delivered);
        assert!(!report.knowledge_persisted);
        assert_eq!(report.session, Some(SessionMutation::Clear));
        assert!(h.sessions.get(USER).is_idle());
        assert!(h.knowledge.saved().is_empty());
        assert_eq!(h.sender.recorded_sends().len(), 1);
    }

    #[tokio::test]
    async fn test_expense_resolving_unknown_learns() {
        let h = harness();
        h.sessions.set(USER, SessionState::awaiting_unknown("X"));
        h.classifier.queue_outcome(expense("10", "mercado"));

        let report = h.orchestrator.handle_turn(message("Y")).await;

        assert!(report.knowledge_persisted);
        let saved = h.knowledge.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].original_query, "X");
        assert_eq!(saved[0].clarification_query, "Y");
        assert_eq!(saved[0].resulting_action, ACTION_ADD_EXPENSE);
        assert!(h.sessions.get(USER).is_idle());
    }

    #[tokio::test]
    async fn test_unknown_then_menu_learns_and_feeds_context() {
        let h = harness();
        h.classifier
            .queue_outcome(IntentOutcome::new(ACTION_UNKNOWN));
        // Capabilities fallback call
        let fallback = IntentOutcome::new(ACTION_UNKNOWN)
            .with_error("Posso registrar despesas!");
        h.classifier.queue_outcome(fallback);

        let report = h.orchestrator.handle_turn(message("oi")).await;
        assert_eq!(report.reply, "Posso registrar despesas!");
        assert_eq!(h.sessions.get(USER), SessionState::awaiting_unknown("oi"));

        h.classifier
            .queue_outcome(IntentOutcome::new(ACTION_SHOW_MENU));
        let report = h.orchestrator.handle_turn(message("menu")).await;
        assert!(report.reply.starts_with("Olá Ana, sou o Wally"));
        assert!(report.knowledge_persisted);
        assert!(h.sessions.get(USER).is_idle());

        let saved = h.knowledge.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].original_query, "oi");
        assert_eq!(saved[0].clarification_query, "menu");
        assert_eq!(saved[0].resulting_action, ACTION_SHOW_MENU);
        assert_eq!(saved[0].resulting_parameters, Parameters::new());

        // The next turn sees the learned episode as context
        h.classifier
            .queue_outcome(IntentOutcome::new(ACTION_SHOW_MENU));
        h.orchestrator.handle_turn(message("oi")).await;
        let calls = h.classifier.recorded_calls();
        let (_, context) = calls.last().unwrap();
        assert!(context.contains("'oi' e depois esclareceu com 'menu'"));
    }

    #[tokio::test]
    async fn test_classifier_failure_sends_apology_only() {
        let h = harness();
        h.sessions
            .set(USER, SessionState::awaiting_unknown("antes"));
        h.classifier
            .queue_error(ClassificationError::Llm(LlmError::network("connection refused")));

        let report = h.orchestrator.handle_turn(message("menu")).await;

        assert!(report.classification_failed);
        assert_eq!(report.session, None);
        assert_eq!(
            h.sender.recorded_sends(),
            vec![(USER.to_string(), replies::CLASSIFIER_UNAVAILABLE.to_string())]
        );
        // Pending clarification survives
        assert_eq!(
            h.sessions.get(USER),
            SessionState::awaiting_unknown("antes")
        );
        assert!(h.knowledge.saved().is_empty());
    }

    #[tokio::test]
    async fn test_capabilities_fallback_degrades_to_canned() {
        let h = harness();
        h.classifier
            .queue_outcome(IntentOutcome::new(ACTION_UNKNOWN));
        // No fallback outcome queued: the second call fails

        let report = h.orchestrator.handle_turn(message("???")).await;
        assert_eq!(report.reply, replies::FALLBACK_CANNED);

        h.classifier
            .queue_outcome(IntentOutcome::new(ACTION_UNKNOWN));
        h.classifier
            .queue_outcome(IntentOutcome::new(ACTION_UNKNOWN));
        let report = h.orchestrator.handle_turn(message("???")).await;
        assert_eq!(report.reply, replies::FALLBACK_CANNED);

        let calls = h.classifier.recorded_calls();
        assert!(calls[1].0.contains("Você é um assistente financeiro"));
        assert_eq!(calls[1].1, "");
    }

    #[tokio::test]
    async fn test_retrieval_failure_uses_empty_context() {
        let h = harness();
        h.knowledge.set_failing(true);
        h.classifier
            .queue_outcome(IntentOutcome::new(ACTION_SHOW_MENU));

        let report = h.orchestrator.handle_turn(message("menu")).await;

        assert!(report.delivered);
        assert_eq!(h.classifier.recorded_calls()[0].1, "");
    }

    #[tokio::test]
    async fn test_save_failure_is_swallowed() {
        let h = harness();
        h.sessions.set(USER, SessionState::awaiting_unknown("oi"));
        h.classifier
            .queue_outcome(IntentOutcome::new(ACTION_SHOW_MENU));
        h.knowledge.set_failing(true);

        let report = h.orchestrator.handle_turn(message("menu")).await;

        assert!(report.delivered);
        assert!(!report.knowledge_persisted);
        assert!(h.sessions.get(USER).is_idle());
    }

    #[tokio::test]
    async fn test_send_failure_keeps_session_mutation() {
        let h = harness();
        h.sender.set_failing(true);
        let outcome = IntentOutcome::new(ACTION_ADD_EXPENSE)
            .with_param("amount", "5");
        h.classifier.queue_outcome(outcome);

        let report = h.orchestrator.handle_turn(message("gastei 5")).await;

        assert!(!report.delivered);
        assert_eq!(
            h.sessions.get(USER),
            SessionState::AwaitingExpenseClarification
        );
    }

    #[tokio::test]
    async fn test_retrieval_caps_at_three_entries() {
        let store = MockKnowledgeStore::new();
        for original in ["a", "b", "c", "d"] {
            store.seed(NewKnowledgeEntry {
                user_id: USER.to_string(),
                original_query: original.to_string(),
                clarification_query: String::new(),
                resulting_action: ACTION_SHOW_MENU.to_string(),
                resulting_parameters: Parameters::new(),
            });
        }
        let context = store.retrieve_relevant_knowledge(USER, "").await.unwrap();
        let lines: Vec<_> = context.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("'b'"));
        assert!(lines[2].contains("'d'"));
    }
}
