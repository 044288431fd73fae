//! # Synced Canvas
//!
//! A shared drawing surface that any number of browsers can draw on at once.
//! Every stroke a client sends over its WebSocket is validated, appended to an
//! ordered in-memory history and relayed to every connected client.
//!
//! ## Modules
//!
//! - [`websocket`]: Connection hub, per-channel read loops and fan-out
//! - [`canvas`]: Drawing elements, the shared history and the frame processor
//! - [`api`]: HTTP server with Axum (snapshot, reset, health, WebSocket upgrade)
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use synced_canvas::{serve, AppState, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env();
//!     let state = AppState::new(config.hub.clone());
//!
//!     // Runs until Ctrl+C, then closes every WebSocket
//!     serve(state, &config.server).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod canvas;
pub mod config;
pub mod websocket;

pub use api::{build_router, serve, ApiError, ApiResult, AppState};

pub use canvas::{
    decode_frame, CanvasError, CanvasProcessor, CanvasResult, DrawingElement, ElementKind,
    Envelope, HistoryStore, Line, Point,
};

pub use config::{
    generate_default_config, Config, ConfigError, LoggingConfig, ServerConfig,
    DEFAULT_MAX_MESSAGE_SIZE,
};

pub use websocket::{
    websocket_handler, ChannelError, ChannelId, ConnectionHub, Frame, FrameSink, FrameStream,
    HubConfig, HubError, MessageProcessor,
};
