//! HTTP surface: the messaging provider's webhook plus health checks

mod handlers;
mod types;

pub use handlers::create_router;

use crate::runtime::TurnHandler;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub turns: Arc<dyn TurnHandler>,
}

impl AppState {
    pub fn new(turns: Arc<dyn TurnHandler>) -> Self {
        Self { turns }
    }
}
