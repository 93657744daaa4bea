//! Database schema and record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS knowledge_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    original_query TEXT NOT NULL,
    clarification_query TEXT,
    resulting_action TEXT NOT NULL,
    resulting_parameters TEXT NOT NULL DEFAULT '{}',
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_knowledge_user_time
    ON knowledge_entries(user_id, timestamp DESC);
";

/// Slot values extracted by the classifier, keyed by parameter name
pub type Parameters = BTreeMap<String, String>;

/// A resolved clarification episode. Rows are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: i64,
    pub user_id: String,
    pub original_query: String,
    /// Empty when the episode resolved without a follow-up message
    pub clarification_query: String,
    pub resulting_action: String,
    pub resulting_parameters: Parameters,
    pub timestamp: DateTime<Utc>,
}

/// Insert payload for a knowledge entry; id and timestamp are assigned by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewKnowledgeEntry {
    pub user_id: String,
    pub original_query: String,
    pub clarification_query: String,
    pub resulting_action: String,
    pub resulting_parameters: Parameters,
}
