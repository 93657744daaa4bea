//! HTTP request handlers

use super::types::{ErrorResponse, HealthResponse, WebhookPayload, WebhookResponse};
use super::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Messaging provider events
        .route("/webhook", post(receive_webhook))
        .route("/health", get(health))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Webhook
// ============================================================

/// Decode the event and queue its turn; the provider is answered before the
/// turn runs.
async fn receive_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    let payload: WebhookPayload = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "Failed to decode webhook payload");
        AppError::BadRequest(format!("invalid webhook payload: {e}"))
    })?;

    let inbound = match payload.to_inbound() {
        Ok(inbound) => inbound,
        Err(reason) => {
            tracing::debug!(
                event = %payload.event,
                message_id = %payload.data.messages.key.id,
                ?reason,
                "Ignoring webhook event"
            );
            return Ok(Json(WebhookResponse { queued: false }));
        }
    };

    tracing::info!(
        event = %payload.event,
        session_id = %payload.session_id,
        message_id = %payload.data.messages.key.id,
        user = %inbound.user_id,
        "Inbound message queued"
    );

    let turns = state.turns.clone();
    tokio::spawn(async move {
        turns.handle_turn(inbound).await;
    });

    Ok(Json(WebhookResponse { queued: true }))
}

// ============================================================
// Health and version
// ============================================================

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        sessions: state.turns.active_sessions(),
    })
}

async fn get_version() -> &'static str {
    concat!("wally ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
