//! Relay HTTP surface driven through the router without a socket

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use relay_server::{Config, ServerState, build_app};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

fn test_config() -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        log_level: "debug".into(),
        log_dir: None,
        studio_timeout: Duration::from_secs(5),
        log_buffer_capacity: 3,
        peer_idle_timeout: Duration::from_secs(10),
        cloud: None,
    }
}

fn app() -> (Router, ServerState) {
    let state = ServerState::with_cloud(test_config(), None);
    (build_app(state.clone()), state)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_empty_queue_returns_empty_object() {
    let (app, _state) = app();
    let (status, body) = call(&app, Method::GET, "/plugin_command", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_studio_execute_round_trip() {
    let (app, state) = app();

    let caller = {
        let app = app.clone();
        tokio::spawn(async move {
            call(
                &app,
                Method::POST,
                "/api/execute",
                Some(json!({"target": "studio", "action": "get_selection", "data": {}})),
            )
            .await
        })
    };

    let command = loop {
        let (_, body) = call(&app, Method::GET, "/plugin_command", None).await;
        if body != json!({}) {
            break body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };
    assert_eq!(command["action"], "get_selection");
    let request_id = command["request_id"].as_str().unwrap().to_string();
    assert!(state.bridge.is_pending(&request_id));

    let (status, ack) = call(
        &app,
        Method::POST,
        "/plugin_report_result",
        Some(json!({"request_id": request_id, "result": {"selection": ["Part"]}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({"status": "success", "request_id": request_id}));

    let (status, body) = caller.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"], json!({"selection": ["Part"]}));
    assert_eq!(state.bridge.pending_count(), 0);
}

#[tokio::test]
async fn test_unknown_result_is_acknowledged() {
    let (app, state) = app();

    let (status, ack) = call(
        &app,
        Method::POST,
        "/plugin_report_result",
        Some(json!({"request_id": "stale-id", "result": "late"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "success");
    assert_eq!(ack["request_id"], "stale-id");
    assert_eq!(state.bridge.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_studio_timeout_is_gateway_timeout() {
    let (app, state) = app();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/execute",
        Some(json!({"target": "studio", "action": "slow", "timeout_secs": 1})),
    )
    .await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["code"], 7004);
    assert_eq!(body["details"]["action"], "slow");
    assert_eq!(state.bridge.pending_count(), 0);
    // The command stays deliverable; a late report is simply unknown
    assert_eq!(state.bridge.queued_count(), 1);
}

#[tokio::test]
async fn test_cloud_call_without_config() {
    let (app, _state) = app();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/execute",
        Some(json!({"target": "cloud", "call": {"op": "luau", "script": "print(1)"}})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 9005);
}

#[tokio::test]
async fn test_batch_then_poll_in_order() {
    let (app, _state) = app();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/execute",
        Some(json!({"target": "studio_batch", "commands": [
            {"action": "insert", "data": {"name": "A"}},
            {"action": "insert", "data": {"name": "B"}}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["queued"], 2);

    let (_, first) = call(&app, Method::GET, "/plugin_command", None).await;
    let (_, second) = call(&app, Method::GET, "/plugin_command", None).await;
    assert_eq!(first, json!({"action": "insert", "data": {"name": "A"}}));
    assert_eq!(second["data"]["name"], "B");
}

#[tokio::test]
async fn test_studio_logs_are_buffered() {
    let (app, _state) = app();

    let entries: Vec<Value> = (1..=5)
        .map(|i| json!({"message": format!("line {i}"), "log_type": "MessageOutput", "timestamp": 1.5}))
        .collect();
    let (status, ack) = call(&app, Method::POST, "/receive_studio_logs", Some(json!(entries))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({"status": "success", "received": 5}));

    // Capacity is 3, so only the newest three remain
    let (_, body) = call(&app, Method::GET, "/api/studio/logs", None).await;
    let messages: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["message"].as_str().unwrap())
        .collect();
    assert_eq!(messages, ["line 3", "line 4", "line 5"]);

    let (_, body) = call(&app, Method::GET, "/api/studio/logs?limit=1", None).await;
    assert_eq!(body["data"][0]["message"], "line 5");
    assert!(body["data"][0]["received_at"].is_string());
}

#[tokio::test]
async fn test_health_reflects_plugin_activity() {
    let (app, state) = app();

    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": "ok",
            "plugin_connected": false,
            "pending_results": 0,
            "queued_commands": 0,
            "cloud_configured": false
        })
    );

    state.bridge.enqueue_detached("noop", Default::default());
    call(&app, Method::GET, "/plugin_command", None).await;
    state.bridge.enqueue_detached("noop", Default::default());

    let (_, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(body["plugin_connected"], true);
    assert_eq!(body["queued_commands"], 1);
}
