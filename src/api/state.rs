//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::canvas::{CanvasProcessor, HistoryStore};
use crate::config::DEFAULT_MAX_MESSAGE_SIZE;
use crate::websocket::{ConnectionHub, HubConfig};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Ordered history of accepted drawing elements
    pub history: Arc<HistoryStore>,
    /// WebSocket connection hub fanning strokes out to clients
    pub hub: Arc<ConnectionHub>,
    /// Largest inbound WebSocket message accepted on upgrade, in bytes
    pub max_message_size: usize,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Wire a fresh history into a hub built from `hub_config`
    pub fn new(hub_config: HubConfig) -> Self {
        let history = Arc::new(HistoryStore::new());
        let processor = Arc::new(CanvasProcessor::new(Arc::clone(&history)));
        let hub = Arc::new(ConnectionHub::new(hub_config, processor));
        Self::with_parts(history, hub)
    }

    /// Create AppState from existing components
    pub fn with_parts(history: Arc<HistoryStore>, hub: Arc<ConnectionHub>) -> Self {
        Self {
            history,
            hub,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            start_time: Instant::now(),
        }
    }

    /// Limit inbound WebSocket messages to `bytes`
    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
