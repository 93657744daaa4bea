//! Clarification state machine
//!
//! A pure transition from (prior session, message, classifier outcome) to the
//! reply, session mutation and learned-context entry for one turn. All I/O
//! lives in the runtime.

mod effect;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Reply, SessionMutation};
pub use state::{Expense, PriorSession, TurnInput};
pub use transition::transition;
