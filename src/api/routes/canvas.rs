//! Canvas Routes
//!
//! - GET /canvas/lines - Snapshot of every stroke drawn so far
//! - POST /canvas/reset - Clear the drawing history

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::LinesResponse;
use crate::api::state::AppState;

/// GET /canvas/lines
///
/// New clients call this once after connecting; the WebSocket only carries
/// strokes drawn from then on.
pub async fn get_lines(State(state): State<Arc<AppState>>) -> Json<LinesResponse> {
    Json(LinesResponse {
        lines: state.history.lines().await,
    })
}

/// POST /canvas/reset
pub async fn reset(State(state): State<Arc<AppState>>) -> StatusCode {
    state.history.reset().await;
    StatusCode::OK
}
