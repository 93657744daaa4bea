//! Property-based tests for the turn transition
//!
//! These tests verify key invariants hold across all possible inputs.

use super::transition::{normalize_amount, TransitionResult};
use super::*;
use crate::intent::{IntentOutcome, ACTION_ADD_EXPENSE, ACTION_SHOW_MENU, ACTION_UNKNOWN};
use crate::session::SessionState;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_prior() -> impl Strategy<Value = PriorSession> {
    (proptest::option::of("[a-z ]{0,20}"), any::<bool>())
        .prop_map(|(original, expense)| PriorSession::new(original, expense))
}

fn arb_input() -> impl Strategy<Value = TurnInput> {
    ("[0-9]{8,13}", "[a-zA-Z0-9 ,.]{1,30}", "[A-Za-z]{0,10}")
        .prop_map(|(user, message, name)| TurnInput::new(user, message, name))
}

fn arb_amount() -> impl Strategy<Value = String> {
    prop_oneof![
        "[0-9]{1,5}",
        "[0-9]{1,5},[0-9]{2}",
        "R\\$ ?[0-9]{1,4}(\\.[0-9]{2})?",
        "[a-z]{0,6}",
        ".{0,10}",
    ]
}

fn arb_outcome() -> impl Strategy<Value = IntentOutcome> {
    let action = prop_oneof![
        Just(ACTION_ADD_EXPENSE.to_string()),
        Just(ACTION_SHOW_MENU.to_string()),
        Just(ACTION_UNKNOWN.to_string()),
        "[a-z_]{0,12}",
    ];
    (
        action,
        proptest::option::of(arb_amount()),
        proptest::option::of("[A-Za-z ]{0,10}"),
        proptest::option::of("[A-Za-z ?]{0,20}"),
    )
        .prop_map(|(action, amount, category, error)| {
            let mut outcome = IntentOutcome::new(action);
            if let Some(amount) = amount {
                outcome = outcome.with_param("amount", amount);
            }
            if let Some(category) = category {
                outcome = outcome.with_param("category", category);
            }
            outcome.error = error.filter(|e| !e.trim().is_empty());
            outcome
        })
}

fn is_success(result: &TransitionResult) -> bool {
    result.expense.is_some()
        || matches!(&result.reply, Reply::Text(t) if t.contains("sou o Wally"))
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn prop_normalization_is_idempotent(raw in ".{0,20}") {
        let once = normalize_amount(&raw);
        prop_assert_eq!(normalize_amount(&once), once.clone());
        prop_assert!(once.chars().all(|c| c.is_ascii_digit() || c == '.'));
    }

    #[test]
    fn prop_transition_is_deterministic(
        prior in arb_prior(),
        input in arb_input(),
        outcome in arb_outcome(),
    ) {
        let a = transition(&prior, &input, &outcome);
        let b = transition(&prior, &input, &outcome);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_never_sets_idle(
        prior in arb_prior(),
        input in arb_input(),
        outcome in arb_outcome(),
    ) {
        let result = transition(&prior, &input, &outcome);
        prop_assert!(
            !matches!(result.new_session, SessionMutation::Set(SessionState::Idle)),
            "Idle must be expressed as Clear"
        );
    }

    #[test]
    fn prop_knowledge_only_on_success_with_prior_unknown(
        prior in arb_prior(),
        input in arb_input(),
        outcome in arb_outcome(),
    ) {
        let result = transition(&prior, &input, &outcome);
        match &result.knowledge {
            Some(entry) => {
                prop_assert!(prior.has_unknown());
                prop_assert!(is_success(&result));
                prop_assert_eq!(Some(&entry.original_query), prior.unknown_original.as_ref());
                prop_assert_eq!(&entry.clarification_query, &input.message);
                prop_assert_eq!(&result.new_session, &SessionMutation::Clear);
            }
            None => prop_assert!(!(prior.has_unknown() && is_success(&result))),
        }
    }

    #[test]
    fn prop_unknown_intent_arms_current_message(
        prior in arb_prior(),
        input in arb_input(),
    ) {
        let result = transition(&prior, &input, &IntentOutcome::new(ACTION_UNKNOWN));
        prop_assert_eq!(
            result.new_session,
            SessionMutation::Set(SessionState::awaiting_unknown(input.message.clone()))
        );
        prop_assert_eq!(result.reply, Reply::CapabilitiesFallback { message: input.message });
        prop_assert!(result.knowledge.is_none());
    }

    #[test]
    fn prop_recorded_expense_is_finite_and_clears(
        prior in arb_prior(),
        input in arb_input(),
        outcome in arb_outcome(),
    ) {
        let result = transition(&prior, &input, &outcome);
        if let Some(expense) = &result.expense {
            prop_assert!(expense.amount.is_finite());
            prop_assert!(!expense.category.is_empty());
            prop_assert_eq!(&expense.user_id, &input.user_id);
            prop_assert_eq!(&result.new_session, &SessionMutation::Clear);
        }
    }

    #[test]
    fn prop_failed_expense_stays_armed(
        prior in arb_prior(),
        input in arb_input(),
        amount in arb_amount(),
        category in "[A-Za-z ]{0,10}",
    ) {
        let outcome = IntentOutcome::new(ACTION_ADD_EXPENSE)
            .with_param("amount", amount)
            .with_param("category", category);
        let result = transition(&prior, &input, &outcome);
        if result.expense.is_none() {
            prop_assert!(result.new_session.is_armed());
            let expected = if prior.has_unknown() {
                SessionState::awaiting_unknown(input.message.clone())
            } else {
                SessionState::AwaitingExpenseClarification
            };
            prop_assert_eq!(result.new_session, SessionMutation::Set(expected));
        }
    }
}
