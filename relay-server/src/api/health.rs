//! Health check
//!
//! ```json
//! {
//!   "status": "ok",
//!   "plugin_connected": true,
//!   "pending_results": 0,
//!   "queued_commands": 1,
//!   "cloud_configured": false
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    /// Whether the plugin polled within the idle timeout
    plugin_connected: bool,
    /// Callers waiting on a plugin result
    pending_results: usize,
    /// Commands not yet picked up by the plugin
    queued_commands: usize,
    cloud_configured: bool,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        plugin_connected: state.monitor.plugin_connected(),
        pending_results: state.bridge.pending_count(),
        queued_commands: state.bridge.queued_count(),
        cloud_configured: state.executor.cloud_configured(),
    })
}
