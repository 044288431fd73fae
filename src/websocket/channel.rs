//! Duplex Frame Channels
//!
//! The hub never talks to a socket directly. Each client connection is split
//! into an outbound [`FrameSink`] and an inbound [`FrameStream`], so the hub
//! only deals in opaque frames and the transport (WebSocket, in-memory test
//! pipes) stays behind these two traits.

use async_trait::async_trait;
use thiserror::Error;

/// One opaque message as received from or sent to a client
pub type Frame = Vec<u8>;

/// Outbound half of a client channel
#[async_trait]
pub trait FrameSink: Send + 'static {
    /// Write one frame to the peer
    async fn send(&mut self, frame: &[u8]) -> Result<(), ChannelError>;

    /// Physically close the channel
    async fn close(&mut self) -> Result<(), ChannelError>;
}

/// Inbound half of a client channel
#[async_trait]
pub trait FrameStream: Send + 'static {
    /// Wait for the next frame.
    ///
    /// Returns `Ok(None)` once the peer has closed the stream cleanly.
    async fn recv(&mut self) -> Result<Option<Frame>, ChannelError>;
}

/// Transport-level failures on a single channel
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The channel is already closed
    #[error("Channel closed")]
    Closed,

    /// The underlying transport failed
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<axum::Error> for ChannelError {
    fn from(err: axum::Error) -> Self {
        ChannelError::Transport(err.to_string())
    }
}
