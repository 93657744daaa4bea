//! Learned context ("RAG-lite")
//!
//! Resolved clarification episodes are appended to the database and the most
//! recent ones are rendered into a context block for the classifier prompt.
//! Retrieval is recency-only; the current message is accepted as a hint but
//! does not filter or rank entries.

use crate::db::{CommitGate, Database, DbError, KnowledgeEntry, NewKnowledgeEntry};
use crate::runtime::KnowledgeStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// Number of entries rendered into the classifier context
pub const RECENT_KNOWLEDGE_LIMIT: usize = 3;

const PERSISTENCE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("persistence call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("persistence task failed: {0}")]
    Task(String),
}

/// Render entries (given newest first) as a context block, oldest first.
///
/// One line per entry. Returns an empty string when there are no entries.
pub fn render_context(entries_newest_first: &[KnowledgeEntry]) -> String {
    entries_newest_first
        .iter()
        .rev()
        .map(render_entry)
        .collect()
}

fn render_entry(entry: &KnowledgeEntry) -> String {
    let clarification = if entry.clarification_query.is_empty() {
        String::new()
    } else {
        format!(" e depois esclareceu com '{}'", entry.clarification_query)
    };
    let parameters = entry
        .resulting_parameters
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Anteriormente, quando o usuário disse algo como '{}'{clarification}, a intenção foi '{}' com parâmetros '{parameters}'.\n",
        entry.original_query, entry.resulting_action
    )
}

/// Knowledge store over the `SQLite` database
///
/// rusqlite is blocking, so each call runs on the blocking pool under a
/// bounded timeout. A write still in flight when the timeout fires is rolled
/// back instead of committed.
#[derive(Clone)]
pub struct DatabaseKnowledgeStore {
    db: Database,
    timeout: Duration,
}

impl DatabaseKnowledgeStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            timeout: PERSISTENCE_TIMEOUT,
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[allow(dead_code)] // Useful for tests
    pub fn inner(&self) -> &Database {
        &self.db
    }

    async fn run_blocking<T, F>(&self, op: F) -> Result<T, PersistenceError>
    where
        T: Send + 'static,
        F: FnOnce(&Database, &CommitGate) -> Result<T, DbError> + Send + 'static,
    {
        let db = self.db.clone();
        let gate = Arc::new(CommitGate::new());
        let worker_gate = Arc::clone(&gate);
        let mut task = tokio::task::spawn_blocking(move || op(&db, &worker_gate));

        let joined = match timeout(self.timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) if gate.try_abandon() => return Err(PersistenceError::Timeout(self.timeout)),
            // The write is already committing; report its real outcome
            Err(_) => task.await,
        };
        match joined {
            Ok(result) => result.map_err(PersistenceError::from),
            Err(join_err) => Err(PersistenceError::Task(join_err.to_string())),
        }
    }
}

#[async_trait]
impl KnowledgeStore for DatabaseKnowledgeStore {
    async fn save_knowledge(
        &self,
        entry: NewKnowledgeEntry,
    ) -> Result<KnowledgeEntry, PersistenceError> {
        let saved = self
            .run_blocking(move |db, gate| db.insert_knowledge(&entry, gate))
            .await?;
        tracing::info!(
            user = %saved.user_id,
            entry_id = saved.id,
            original = %saved.original_query,
            clarification = %saved.clarification_query,
            action = %saved.resulting_action,
            "Knowledge entry saved"
        );
        Ok(saved)
    }

    async fn retrieve_relevant_knowledge(
        &self,
        user_id: &str,
        current_query_hint: &str,
    ) -> Result<String, PersistenceError> {
        let user = user_id.to_string();
        let entries = self
            .run_blocking(move |db, _| db.recent_knowledge(&user, RECENT_KNOWLEDGE_LIMIT))
            .await?;

        let context = render_context(&entries);
        if !context.is_empty() {
            tracing::debug!(
                user = %user_id,
                hint = %current_query_hint,
                entries = entries.len(),
                "Retrieved learned context"
            );
        }
        Ok(context)
    }
}
