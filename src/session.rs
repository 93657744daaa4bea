//! Per-user clarification sessions
//!
//! An owned, injectable store mapping a user identifier to the single pending
//! clarification for that user. Absence of an entry means the user is idle.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

const EXPENSE_TAG: &str = "awaiting_clarification_expense";
const UNKNOWN_TAG_PREFIX: &str = "awaiting_clarification_unknown:";

/// Pending clarification for a user
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing pending. Never stored.
    #[default]
    Idle,
    /// The last expense attempt was missing or had malformed slots
    AwaitingExpenseClarification,
    /// The message `original` could not be understood
    AwaitingUnknownClarification { original: String },
}

impl SessionState {
    pub fn awaiting_unknown(original: impl Into<String>) -> Self {
        SessionState::AwaitingUnknownClarification {
            original: original.into(),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    /// Flat tag form, used in log records
    pub fn tag(&self) -> String {
        match self {
            SessionState::Idle => "idle".to_string(),
            SessionState::AwaitingExpenseClarification => EXPENSE_TAG.to_string(),
            SessionState::AwaitingUnknownClarification { original } => {
                format!("{UNKNOWN_TAG_PREFIX}{original}")
            }
        }
    }
}

/// Concurrent user → session state map
///
/// Reads share the lock and writes take it exclusively. The lock is never held
/// across an await point, so turns for different users never wait on each other
/// for longer than a single map operation.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the state for `user`. Setting `Idle` removes the entry.
    pub fn set(&self, user: &str, state: SessionState) {
        if state.is_idle() {
            self.delete(user);
            return;
        }
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        sessions.insert(user.to_string(), state);
    }

    /// Non-destructive read; `Idle` when no entry exists
    pub fn get(&self, user: &str) -> SessionState {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(user).cloned().unwrap_or_default()
    }

    /// Remove the entry for `user`, if any
    pub fn delete(&self, user: &str) {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        sessions.remove(user);
    }

    /// Atomically remove and return the state for `user` when `predicate` holds.
    ///
    /// The check and the removal happen under one write lock; when the predicate
    /// is false the entry is left untouched.
    pub fn take_if<F>(&self, user: &str, predicate: F) -> Option<SessionState>
    where
        F: FnOnce(&SessionState) -> bool,
    {
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if sessions.get(user).is_some_and(predicate) {
            sessions.remove(user)
        } else {
            None
        }
    }

    /// Take a pending unknown-intent clarification, returning the original message.
    pub fn take_unknown_clarification(&self, user: &str) -> Option<String> {
        match self.take_if(user, |state| {
            matches!(state, SessionState::AwaitingUnknownClarification { .. })
        }) {
            Some(SessionState::AwaitingUnknownClarification { original }) => Some(original),
            _ => None,
        }
    }

    /// Number of users with a pending clarification
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[allow(dead_code)] // API completeness
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
