//! Studio plugin endpoints
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /plugin_command | GET | next queued command, or `{}` |
//! | /plugin_report_result | POST | result for a correlated command |
//! | /receive_studio_logs | POST | batch of studio output lines |

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use shared::{LogsAck, PluginResultPayload, RemoteValue, ReportAck, StudioLogEntry};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/plugin_command", get(next_command))
        .route("/plugin_report_result", post(report_result))
        .route("/receive_studio_logs", post(receive_logs))
}

async fn next_command(State(state): State<ServerState>) -> Response {
    match state.bridge.next_command() {
        Some(command) => Json(command).into_response(),
        None => Json(RemoteValue::empty_map()).into_response(),
    }
}

/// Always acknowledged; an unknown id is logged by the bridge and otherwise ignored
async fn report_result(
    State(state): State<ServerState>,
    Json(payload): Json<PluginResultPayload>,
) -> Json<ReportAck> {
    let _ = state.bridge.report_result(&payload.request_id, payload.result);
    Json(ReportAck::success(payload.request_id))
}

async fn receive_logs(
    State(state): State<ServerState>,
    Json(entries): Json<Vec<StudioLogEntry>>,
) -> Json<LogsAck> {
    let received = state.logs.push_batch(entries);
    tracing::debug!(received, "Studio log entries received");
    Json(LogsAck::success(received))
}
