//! Inputs and domain records for a turn

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One inbound message as seen by the transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnInput {
    pub user_id: String,
    pub message: String,
    pub display_name: String,
    pub now: DateTime<Utc>,
}

impl TurnInput {
    pub fn new(
        user_id: impl Into<String>,
        message: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            message: message.into(),
            display_name: display_name.into(),
            now: Utc::now(),
        }
    }
}

/// Session facts observed before the transition runs
///
/// `unknown_original` has already been taken out of the store; the expense
/// flag is only peeked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorSession {
    pub unknown_original: Option<String>,
    pub awaiting_expense: bool,
}

impl PriorSession {
    pub fn new(unknown_original: Option<String>, awaiting_expense: bool) -> Self {
        Self {
            unknown_original: unknown_original.filter(|o| !o.is_empty()),
            awaiting_expense,
        }
    }

    pub fn has_unknown(&self) -> bool {
        self.unknown_original.is_some()
    }
}

/// A successfully recorded expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub user_id: String,
    pub amount: f64,
    pub category: String,
    pub created_at: DateTime<Utc>,
}
