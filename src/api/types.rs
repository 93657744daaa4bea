//! API request and response types

use crate::runtime::InboundMessage;
use serde::{Deserialize, Serialize};

const JID_SUFFIX: &str = "@s.whatsapp.net";

/// Event posted by `WaSender` to the webhook
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub session_id: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub messages: WebhookMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookMessage {
    pub key: MessageKey,
    #[serde(default)]
    pub push_name: String,
    #[serde(default)]
    pub message: Option<MessageBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    pub remote_jid: String,
    #[serde(default)]
    pub from_me: bool,
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    pub conversation: Option<String>,
    pub extended_text_message: Option<ExtendedTextMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ExtendedTextMessage {
    pub text: Option<String>,
}

/// Why a decoded webhook event produced no turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dropped {
    FromSelf,
    NoText,
}

impl WebhookPayload {
    /// Sender number without the transport suffix
    pub fn sender(&self) -> &str {
        let jid = self.data.messages.key.remote_jid.as_str();
        jid.strip_suffix(JID_SUFFIX).unwrap_or(jid)
    }

    fn text(&self) -> Option<&str> {
        let body = self.data.messages.message.as_ref()?;
        body.conversation
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| {
                body.extended_text_message
                    .as_ref()
                    .and_then(|m| m.text.as_deref())
                    .filter(|t| !t.trim().is_empty())
            })
    }

    pub fn to_inbound(&self) -> Result<InboundMessage, Dropped> {
        if self.data.messages.key.from_me {
            return Err(Dropped::FromSelf);
        }
        let text = self.text().ok_or(Dropped::NoText)?;
        Ok(InboundMessage::new(
            self.sender(),
            text,
            self.data.messages.push_name.as_str(),
        ))
    }
}

/// Webhook acknowledgement
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub queued: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
