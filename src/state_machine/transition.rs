//! Pure turn transition
//!
//! Given the same prior session, input and classifier outcome this always
//! produces the same result. Nothing here touches the session store, the
//! database or the network.

use super::{Expense, PriorSession, Reply, SessionMutation, TurnInput};
use crate::db::NewKnowledgeEntry;
use crate::intent::{IntentAction, IntentOutcome};
use crate::replies;
use crate::session::SessionState;
use thiserror::Error;

/// Result of a turn transition
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionResult {
    pub new_session: SessionMutation,
    pub reply: Reply,
    pub knowledge: Option<NewKnowledgeEntry>,
    pub expense: Option<Expense>,
}

impl TransitionResult {
    fn new(new_session: SessionMutation, reply: Reply) -> Self {
        Self {
            new_session,
            reply,
            knowledge: None,
            expense: None,
        }
    }

    fn with_knowledge(mut self, knowledge: Option<NewKnowledgeEntry>) -> Self {
        self.knowledge = knowledge;
        self
    }

    fn with_expense(mut self, expense: Expense) -> Self {
        self.expense = Some(expense);
        self
    }
}

/// Why an `add_expense` outcome could not be recorded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("amount or category missing")]
    MissingSlots { error: Option<String> },
    #[error("amount '{normalized}' is not a number")]
    InvalidAmount { normalized: String },
}

impl ValidationError {
    fn reply(&self) -> String {
        match self {
            ValidationError::MissingSlots { error } => {
                replies::expense_missing_slots(error.as_deref())
            }
            ValidationError::InvalidAmount { normalized } => replies::invalid_amount(normalized),
        }
    }
}

/// Pure transition function
pub fn transition(
    prior: &PriorSession,
    input: &TurnInput,
    outcome: &IntentOutcome,
) -> TransitionResult {
    match outcome.kind() {
        IntentAction::AddExpense => match validate_expense(input, outcome) {
            Ok(expense) => TransitionResult::new(
                SessionMutation::Clear,
                Reply::text(replies::expense_added(expense.amount, &expense.category)),
            )
            .with_knowledge(learned_entry(prior, input, outcome))
            .with_expense(expense),
            Err(invalid) => {
                TransitionResult::new(rearm(prior, input), Reply::text(invalid.reply()))
            }
        },

        IntentAction::ShowMenu => TransitionResult::new(
            SessionMutation::Clear,
            Reply::text(replies::main_menu(&input.display_name)),
        )
        .with_knowledge(learned_entry(prior, input, outcome)),

        // The current message becomes the original of the next clarification
        IntentAction::UnknownIntent => TransitionResult::new(
            SessionMutation::Set(SessionState::awaiting_unknown(input.message.clone())),
            Reply::CapabilitiesFallback {
                message: input.message.clone(),
            },
        ),

        IntentAction::Other(_) => {
            let new_session = if prior.has_unknown() {
                SessionMutation::Set(SessionState::awaiting_unknown(input.message.clone()))
            } else {
                SessionMutation::Clear
            };
            TransitionResult::new(
                new_session,
                Reply::text(replies::unhandled_action(&input.display_name)),
            )
        }
    }
}

/// Session to arm after a failed expense attempt
fn rearm(prior: &PriorSession, input: &TurnInput) -> SessionMutation {
    if prior.has_unknown() {
        SessionMutation::Set(SessionState::awaiting_unknown(input.message.clone()))
    } else {
        SessionMutation::Set(SessionState::AwaitingExpenseClarification)
    }
}

/// Knowledge entry for a resolved clarification, if one was pending
fn learned_entry(
    prior: &PriorSession,
    input: &TurnInput,
    outcome: &IntentOutcome,
) -> Option<NewKnowledgeEntry> {
    prior
        .unknown_original
        .as_ref()
        .map(|original| NewKnowledgeEntry {
            user_id: input.user_id.clone(),
            original_query: original.clone(),
            clarification_query: input.message.clone(),
            resulting_action: outcome.action.trim().to_string(),
            resulting_parameters: outcome.parameters.clone(),
        })
}

fn validate_expense(
    input: &TurnInput,
    outcome: &IntentOutcome,
) -> Result<Expense, ValidationError> {
    // A blank amount is present and left to normalisation; an empty one is absent
    let raw_amount = outcome
        .parameters
        .get("amount")
        .map(String::as_str)
        .filter(|a| !a.is_empty());
    let (Some(raw_amount), Some(category)) = (raw_amount, outcome.param("category")) else {
        return Err(ValidationError::MissingSlots {
            error: outcome.error.clone(),
        });
    };

    let normalized = normalize_amount(raw_amount);
    let amount = normalized
        .parse::<f64>()
        .ok()
        .filter(|a| a.is_finite())
        .ok_or_else(|| ValidationError::InvalidAmount {
            normalized: normalized.clone(),
        })?;

    Ok(Expense {
        user_id: input.user_id.clone(),
        amount,
        category: category.trim().to_string(),
        created_at: input.now,
    })
}

/// Decimal comma becomes a point; anything but ASCII digits and `.` is dropped
pub fn normalize_amount(raw: &str) -> String {
    raw.chars()
        .map(|c| if c == ',' { '.' } else { c })
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}
