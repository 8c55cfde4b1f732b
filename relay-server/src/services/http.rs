use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

use crate::core::ServerState;
use crate::services::peer_monitor::track_peer;

/// Build the router with every route and layer applied
pub fn build_app(state: ServerState) -> Router {
    let monitor = state.monitor.clone();
    Router::<ServerState>::new()
        .merge(crate::api::plugin::router())
        .merge(crate::api::execute::router())
        .merge(crate::api::health::router())
        .with_state(state)
        .layer(middleware::from_fn_with_state(monitor, track_peer))
        .layer(TraceLayer::new_for_http())
}
