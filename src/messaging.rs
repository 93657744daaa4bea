//! Outbound messaging through the `WaSender` HTTP API

use crate::runtime::MessageSender;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const SEND_TIMEOUT: Duration = Duration::from_secs(15);

/// Failure talking to the messaging provider
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    to: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SetWebhookBody<'a> {
    url: &'a str,
}

/// `WaSender` API client
#[derive(Clone)]
pub struct WaSenderClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl WaSenderClient {
    pub fn new(base_url: &str, api_key: String) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }

    async fn post_json<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Point the provider's webhook at `<public_url>/webhook`
    pub async fn register_webhook(&self, public_url: &str) -> Result<String, TransportError> {
        let url = format!("{}/webhook", public_url.trim_end_matches('/'));
        self.post_json("set-webhook", &SetWebhookBody { url: &url })
            .await?;
        Ok(url)
    }
}

#[async_trait]
impl MessageSender for WaSenderClient {
    async fn send(&self, to: &str, text: &str) -> Result<(), TransportError> {
        self.post_json("send-message", &SendMessageBody { to, text })
            .await
    }
}
