//! Canvas message processor
//!
//! Plugs the history into the hub: every inbound frame is decoded, appended
//! and then relayed unchanged to the connected clients. Frames that fail to
//! decode are logged and dropped; the connection stays open.

use async_trait::async_trait;
use std::sync::Arc;

use super::error::CanvasResult;
use super::store::HistoryStore;
use super::types::{decode_frame, DrawingElement};
use crate::websocket::{ChannelId, ConnectionHub, MessageProcessor};

/// Validates inbound strokes and records them in the shared history
pub struct CanvasProcessor {
    history: Arc<HistoryStore>,
}

impl CanvasProcessor {
    pub fn new(history: Arc<HistoryStore>) -> Self {
        Self { history }
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Decode a frame and append it to the history
    pub async fn accept(&self, frame: &[u8]) -> CanvasResult<DrawingElement> {
        let element = decode_frame(frame)?;
        self.history.append(element.clone()).await;
        Ok(element)
    }
}

#[async_trait]
impl MessageProcessor for CanvasProcessor {
    async fn process(&self, origin: ChannelId, frame: &[u8], hub: &ConnectionHub) {
        match self.accept(frame).await {
            Ok(element) => {
                let delivered = hub.fan_out(origin, frame).await;
                tracing::debug!(
                    channel_id = origin,
                    kind = %element.kind(),
                    delivered,
                    "Accepted drawing element"
                );
            }
            Err(e) => {
                tracing::warn!(
                    channel_id = origin,
                    error = %e,
                    frame = %String::from_utf8_lossy(frame),
                    "Dropped inbound frame"
                );
            }
        }
    }
}
