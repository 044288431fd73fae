//! WebSocket Real-Time Fan-Out
//!
//! Keeps every connected client in sync by relaying accepted frames to all of
//! them.
//!
//! ## Architecture
//!
//! - **ConnectionHub**: Tracks live channels, runs their read loops, broadcasts
//! - **Channel**: Transport-neutral `FrameSink` / `FrameStream` halves
//! - **Handler**: Upgrades HTTP requests and adapts sockets to channels
//!
//! The hub treats frames as opaque bytes. What a frame means is decided by the
//! [`MessageProcessor`] the hub is built with.
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:8080/ws');
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   console.log('Stroke:', msg.data);
//! };
//! ```

mod channel;
mod handler;
mod hub;
#[cfg(test)]
pub(crate) mod memory;

pub use channel::{ChannelError, Frame, FrameSink, FrameStream};
pub use handler::websocket_handler;
pub use hub::{ChannelId, ConnectionHub, HubConfig, HubError, MessageProcessor};
