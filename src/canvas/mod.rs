//! Shared Canvas
//!
//! The drawing model behind the hub:
//!
//! - [`types`]: drawing elements and the `{"type", "data"}` wire envelope
//! - [`store`]: the ordered, shared history of accepted elements
//! - [`processor`]: decodes inbound frames, appends them and relays them

pub mod error;
pub mod processor;
pub mod store;
pub mod types;

pub use error::{CanvasError, CanvasResult};
pub use processor::CanvasProcessor;
pub use store::HistoryStore;
pub use types::{decode_frame, DrawingElement, ElementKind, Envelope, Line, Point};
