//! Application state for Axum handlers.

use relaypost_dispatch::{QueueHandle, RetrySweeper};
use relaypost_store::JobStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub queue: QueueHandle,
    pub store: Arc<dyn JobStore>,
    pub sweeper: Arc<RetrySweeper>,
}

impl AppState {
    /// Creates a new application state.
    #[must_use]
    pub fn new(queue: QueueHandle, store: Arc<dyn JobStore>, sweeper: Arc<RetrySweeper>) -> Self {
        Self {
            queue,
            store,
            sweeper,
        }
    }
}
