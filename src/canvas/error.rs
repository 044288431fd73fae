//! Canvas message error types

use thiserror::Error;

/// Reasons an inbound frame is rejected
#[derive(Error, Debug)]
pub enum CanvasError {
    /// The frame is not a `{"type", "data"}` envelope
    #[error("Malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    /// The envelope names an element kind we don't know
    #[error("Unknown element kind: {0:?}")]
    UnknownKind(String),

    /// The payload doesn't match its declared kind
    #[error("Invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type alias for canvas operations
pub type CanvasResult<T> = Result<T, CanvasError>;
