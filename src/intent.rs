//! Intent classification
//!
//! Turns free text plus learned context into a structured [`IntentOutcome`]
//! using the language model. Output the model gets wrong degrades to
//! `unknown_intent` instead of failing the turn; only transport-level
//! problems surface as [`ClassificationError`].

mod prompt;

pub use prompt::{capabilities_prompt, classification_prompt};

use crate::db::Parameters;
use crate::llm::{LlmError, LlmRequest, LlmService, OutputFormat};
use crate::runtime::IntentClassifier;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

pub const ACTION_ADD_EXPENSE: &str = "add_expense";
pub const ACTION_SHOW_MENU: &str = "show_menu";
pub const ACTION_UNKNOWN: &str = "unknown_intent";

const MAX_OUTPUT_TOKENS: u32 = 512;

const UNPARSEABLE_OUTPUT_ERROR: &str =
    "Não consegui processar a resposta da IA. Tente ser mais específico ou peça o menu.";

/// Classifier failure that prevents any outcome for the turn
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("language model request failed: {0}")]
    Llm(#[from] LlmError),
    #[error("classification timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("language model returned no content")]
    EmptyResponse,
}

/// Structured classifier result
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntentOutcome {
    #[serde(default)]
    pub action: String,
    #[serde(default, deserialize_with = "lenient_parameters")]
    pub parameters: Parameters,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "non_empty_string"
    )]
    pub error: Option<String>,
}

/// Recognized view over [`IntentOutcome::action`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentAction<'a> {
    AddExpense,
    ShowMenu,
    UnknownIntent,
    Other(&'a str),
}

impl IntentOutcome {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn kind(&self) -> IntentAction<'_> {
        match self.action.trim() {
            ACTION_ADD_EXPENSE => IntentAction::AddExpense,
            ACTION_SHOW_MENU => IntentAction::ShowMenu,
            ACTION_UNKNOWN => IntentAction::UnknownIntent,
            other => IntentAction::Other(other),
        }
    }

    /// Whether the outcome names any action at all
    pub fn is_actionable(&self) -> bool {
        !self.action.trim().is_empty()
    }

    /// Parameter value, treating blank values as absent
    pub fn param(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Parse raw model output, degrading to `unknown_intent` when it is not the
/// expected JSON shape
pub fn parse_outcome(raw: &str) -> IntentOutcome {
    match serde_json::from_str::<IntentOutcome>(strip_code_fence(raw)) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(error = %e, raw = %raw, "Classifier output is not a valid intent document");
            IntentOutcome::new(ACTION_UNKNOWN)
                .with_error(UNPARSEABLE_OUTPUT_ERROR)
        }
    }
}

/// Remove a surrounding Markdown code fence, if any
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // Drop an info string such as `json` on the opening fence line
    match rest.split_once('\n') {
        Some((info, body)) if !info.trim_start().starts_with('{') => body.trim(),
        _ => rest.trim(),
    }
}

fn lenient_parameters<'de, D>(deserializer: D) -> Result<Parameters, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Null => return None,
                Value::String(s) => s,
                other => other.to_string(),
            };
            Some((key, value))
        })
        .collect())
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

/// Intent classifier backed by a language model
pub struct LlmIntentClassifier {
    llm: Arc<dyn LlmService>,
    timeout: Duration,
}

impl LlmIntentClassifier {
    pub fn new(llm: Arc<dyn LlmService>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(
        &self,
        message: &str,
        context: &str,
    ) -> Result<IntentOutcome, ClassificationError> {
        if !context.is_empty() {
            tracing::debug!(context = %context, "Classifying with learned context");
        }
        let request = LlmRequest::user_text(classification_prompt(message, context))
            .with_output(OutputFormat::Json)
            .with_max_tokens(MAX_OUTPUT_TOKENS);

        let response = timeout(self.timeout, self.llm.complete(&request))
            .await
            .map_err(|_| ClassificationError::Timeout(self.timeout))??;

        if response.text.trim().is_empty() {
            return Err(ClassificationError::EmptyResponse);
        }
        Ok(parse_outcome(&response.text))
    }
}
