//! Effects produced by a turn transition

use crate::session::SessionState;

/// Reply to send back to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Send this text as is
    Text(String),

    /// Ask the classifier to phrase a capabilities message for `message`,
    /// falling back to a canned text
    CapabilitiesFallback { message: String },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }
}

/// What to do with the user's session entry after the turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMutation {
    Set(SessionState),
    Clear,
}

impl SessionMutation {
    /// Whether the user is left waiting for a clarification
    pub fn is_armed(&self) -> bool {
        matches!(self, SessionMutation::Set(state) if !state.is_idle())
    }
}
