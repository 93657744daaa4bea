//! Wally - conversational intake for a personal-finance chat assistant
//!
//! Receives `WhatsApp` messages through a `WaSender` webhook, classifies them
//! with Gemini and drives a per-user clarification state machine whose
//! resolved episodes are fed back into later prompts as learned context.

mod api;
mod config;
mod db;
mod intent;
mod knowledge;
mod llm;
mod messaging;
mod replies;
mod runtime;
mod session;
mod state_machine;

use api::{create_router, AppState};
use config::Config;
use db::Database;
use intent::LlmIntentClassifier;
use knowledge::DatabaseKnowledgeStore;
use llm::{GeminiService, LlmService, LoggingService};
use messaging::WaSenderClient;
use runtime::ProductionOrchestrator;
use session::SessionStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wally=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = Config::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
    })?;
    tracing::info!(config = ?config, "Configuration loaded");

    // Initialize database
    let db_path = config.database_path();
    tracing::info!(path = %db_path, "Opening database");
    let db = Database::open(db_path)?;

    // Language model and classifier
    let gemini = GeminiService::new(
        config.gemini_key.clone(),
        &config.gemini_model,
        config.classifier_timeout,
    )?;
    let llm: Arc<dyn LlmService> = Arc::new(LoggingService::new(Arc::new(gemini)));
    tracing::info!(model = %llm.model_id(), "Language model initialized");
    let classifier = LlmIntentClassifier::new(llm, config.classifier_timeout);

    // Messaging provider
    let sender = WaSenderClient::new(&config.wasender_base_url, config.api_key.clone())?;
    if let Some(public_url) = &config.public_url {
        match sender.register_webhook(public_url).await {
            Ok(url) => tracing::info!(url = %url, "Webhook registered"),
            Err(e) => tracing::warn!(error = %e, "Webhook registration failed, continuing"),
        }
    }

    // Create application state
    let orchestrator: ProductionOrchestrator = runtime::ConversationOrchestrator::new(
        DatabaseKnowledgeStore::new(db),
        classifier,
        sender,
        Arc::new(SessionStore::new()),
    );
    let state = AppState::new(Arc::new(orchestrator));

    let app = create_router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Wally listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install SIGINT handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT - shutting down"),
        () = terminate => tracing::info!("Received SIGTERM - shutting down"),
    }
}
