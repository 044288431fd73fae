//! Data Transfer Objects
//!
//! Response types for the API endpoints.

use serde::Serialize;

use crate::canvas::Line;

/// Full canvas snapshot
#[derive(Debug, Serialize)]
pub struct LinesResponse {
    /// Every stroke, in the order it was accepted
    pub lines: Vec<Line>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Open WebSocket connections
    pub connections: usize,
    /// Elements in the drawing history
    pub history_len: usize,
    pub uptime_seconds: u64,
    pub version: String,
}
