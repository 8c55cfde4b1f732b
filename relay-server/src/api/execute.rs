//! Execution API for tool callers
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /api/execute | POST | run a [`RemoteCall`] against studio or the cloud |
//! | /api/studio/logs | GET | recent studio output (`?limit=n`, default 50) |

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use shared::{ApiResponse, AppError, AppResult, RemoteValue, StudioLogRecord};

use crate::core::ServerState;
use crate::services::RemoteCall;

const DEFAULT_LOG_LIMIT: usize = 50;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/execute", post(execute))
        .route("/api/studio/logs", get(studio_logs))
}

async fn execute(
    State(state): State<ServerState>,
    Json(call): Json<RemoteCall>,
) -> AppResult<ApiResponse<RemoteValue>> {
    let value = state.executor.execute(call).await.map_err(AppError::from)?;
    Ok(ApiResponse::success(value))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    limit: Option<usize>,
}

async fn studio_logs(
    State(state): State<ServerState>,
    Query(query): Query<LogsQuery>,
) -> ApiResponse<Vec<StudioLogRecord>> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    ApiResponse::success(state.logs.recent(limit))
}
