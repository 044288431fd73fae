//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and adapts the upgraded socket to the
//! hub's frame channel traits.

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use std::sync::Arc;

use super::channel::{ChannelError, Frame, FrameSink, FrameStream};
use super::hub::ConnectionHub;
use crate::api::{ApiError, ApiResult, AppState};

/// WebSocket upgrade handler
///
/// This is the entry point for WebSocket connections. Upgrades are refused
/// once the hub has started shutting down.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Response> {
    if state.hub.is_closing() {
        return Err(ApiError::ServiceUnavailable(
            "Server is shutting down".to_string(),
        ));
    }

    let hub = Arc::clone(&state.hub);
    Ok(ws
        .max_message_size(state.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, hub)))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, hub: Arc<ConnectionHub>) {
    let (sender, receiver) = socket.split();

    if let Err(e) = hub.serve(WsSink(sender), WsStream(receiver)).await {
        tracing::warn!(error = %e, "Rejected WebSocket connection");
    }
}

/// Outbound half of an upgraded WebSocket
struct WsSink(SplitSink<WebSocket, Message>);

/// Inbound half of an upgraded WebSocket
struct WsStream(SplitStream<WebSocket>);

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: &[u8]) -> Result<(), ChannelError> {
        self.0.send(to_message(frame)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.0.close().await?;
        Ok(())
    }
}

#[async_trait]
impl FrameStream for WsStream {
    async fn recv(&mut self) -> Result<Option<Frame>, ChannelError> {
        while let Some(result) = self.0.next().await {
            match result? {
                Message::Text(text) => return Ok(Some(text.into_bytes())),
                Message::Binary(data) => return Ok(Some(data)),
                Message::Close(_) => return Ok(None),
                // Axum answers pings itself
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
        Ok(None)
    }
}

/// Frames that are valid UTF-8 go out as text messages
fn to_message(frame: &[u8]) -> Message {
    match std::str::from_utf8(frame) {
        Ok(text) => Message::Text(text.to_string()),
        Err(_) => Message::Binary(frame.to_vec()),
    }
}
