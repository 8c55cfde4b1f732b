//! HttpExecutor against an in-process HTTP server

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use cloud_client::{ApiRequest, ClientError, Executor, HttpExecutor, Lookup, ResponseBody, RetryPolicy};
use parking_lot::Mutex;
use shared::RemoteValue;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct Canned {
    status: u16,
    headers: Vec<(&'static str, &'static str)>,
    body: &'static str,
}

impl Canned {
    fn new(status: u16, body: &'static str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    fn rate_limited(retry_after: &'static str) -> Self {
        Self {
            status: 429,
            headers: vec![("retry-after", retry_after)],
            body: "slow down",
        }
    }
}

#[derive(Debug, Clone)]
struct Hit {
    at: Instant,
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: String,
}

#[derive(Clone, Default)]
struct Script {
    responses: Arc<Mutex<VecDeque<Canned>>>,
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl Script {
    fn hits(&self) -> Vec<Hit> {
        self.hits.lock().clone()
    }
}

async fn replay(
    State(script): State<Script>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    script.hits.lock().push(Hit {
        at: Instant::now(),
        method,
        uri: uri.to_string(),
        headers,
        body,
    });
    let canned = script
        .responses
        .lock()
        .pop_front()
        .unwrap_or_else(|| Canned::new(200, "{}"));

    let status = StatusCode::from_u16(canned.status).unwrap();
    let mut response = (status, canned.body).into_response();
    for (name, value) in canned.headers {
        response
            .headers_mut()
            .insert(name, HeaderValue::from_static(value));
    }
    response
}

async fn serve(responses: Vec<Canned>) -> (String, Script) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let script = serve_on(listener, responses);
    (format!("http://{addr}"), script)
}

fn serve_on(listener: tokio::net::TcpListener, responses: Vec<Canned>) -> Script {
    let script = Script {
        responses: Arc::new(Mutex::new(responses.into())),
        ..Default::default()
    };
    let app = Router::new().fallback(replay).with_state(script.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    script
}

fn executor(initial_delay: Duration) -> HttpExecutor {
    HttpExecutor::new(
        "test-key",
        Duration::from_secs(5),
        RetryPolicy {
            max_attempts: 3,
            initial_delay,
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_rate_limit_honours_retry_after() {
    let (base, script) = serve(vec![
        Canned::rate_limited("2"),
        Canned::rate_limited("2"),
        Canned::new(200, r#"{"ok":true}"#),
    ])
    .await;

    let body = executor(Duration::from_millis(10))
        .execute(&ApiRequest::get(format!("{base}/thing")))
        .await
        .unwrap();

    assert_eq!(body, ResponseBody::Json(RemoteValue::from(serde_json::json!({"ok": true}))));
    let hits = script.hits();
    assert_eq!(hits.len(), 3);
    assert!(hits[1].at - hits[0].at >= Duration::from_secs(2));
    assert!(hits[2].at - hits[1].at >= Duration::from_secs(2));
    assert_eq!(hits[0].headers.get("x-api-key").unwrap(), "test-key");
}

#[tokio::test]
async fn test_rate_limit_without_retry_after_doubles_delay() {
    let (base, script) = serve(vec![
        Canned::new(429, "slow down"),
        Canned::new(429, "slow down"),
        Canned::new(200, "{}"),
    ])
    .await;

    executor(Duration::from_millis(100))
        .execute(&ApiRequest::get(format!("{base}/thing")))
        .await
        .unwrap();

    let hits = script.hits();
    assert_eq!(hits.len(), 3);
    let first_gap = hits[1].at - hits[0].at;
    let second_gap = hits[2].at - hits[1].at;
    assert!(first_gap >= Duration::from_millis(100));
    assert!(second_gap >= Duration::from_millis(200));
    assert!(second_gap > first_gap);
}

#[tokio::test]
async fn test_oversized_retry_after_uses_running_delay() {
    let (base, script) = serve(vec![
        Canned::rate_limited("99999999999999999999"),
        Canned::new(200, r#"{"ok":true}"#),
    ])
    .await;

    let started = Instant::now();
    let body = executor(Duration::from_millis(10))
        .execute(&ApiRequest::get(format!("{base}/thing")))
        .await
        .unwrap();

    assert!(matches!(body, ResponseBody::Json(_)));
    assert_eq!(script.hits().len(), 2);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_rate_limit_exhausted() {
    let (base, script) = serve(vec![
        Canned::rate_limited("0"),
        Canned::rate_limited("0"),
        Canned::rate_limited("0"),
        Canned::new(200, "{}"),
    ])
    .await;

    let err = executor(Duration::from_millis(10))
        .execute(&ApiRequest::get(format!("{base}/thing")))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::RateLimited { attempts: 3, .. }));
    assert_eq!(script.hits().len(), 3);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let (base, script) = serve(vec![Canned::new(
        400,
        r#"{"code":"INVALID_ARGUMENT","message":"bad entry key"}"#,
    )])
    .await;

    let err = executor(Duration::from_millis(10))
        .execute(&ApiRequest::get(format!("{base}/entry")))
        .await
        .unwrap_err();

    match err {
        ClientError::Remote {
            status,
            message,
            body,
        } => {
            assert_eq!(status, 400);
            assert_eq!(message, "bad entry key");
            assert_eq!(
                body.as_json().and_then(|v| v.field("code")).and_then(|c| c.as_str()),
                Some("INVALID_ARGUMENT")
            );
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(script.hits().len(), 1);
}

#[tokio::test]
async fn test_server_error_keeps_raw_text() {
    let (base, script) = serve(vec![Canned::new(503, "maintenance window")]).await;

    let err = executor(Duration::from_millis(10))
        .execute(&ApiRequest::get(format!("{base}/x")))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(err.to_string(), "HTTP 503: maintenance window");
    assert_eq!(script.hits().len(), 1);
}

#[tokio::test]
async fn test_success_bodies() {
    let (base, _script) = serve(vec![
        Canned::new(200, "just text"),
        Canned::new(204, ""),
        Canned::new(200, "[1,2]"),
    ])
    .await;
    let exec = executor(Duration::from_millis(10));
    let req = ApiRequest::get(format!("{base}/x"));

    assert_eq!(exec.execute(&req).await.unwrap(), ResponseBody::Text("just text".into()));
    assert_eq!(exec.execute(&req).await.unwrap(), ResponseBody::Empty);
    assert!(matches!(exec.execute(&req).await.unwrap(), ResponseBody::Json(RemoteValue::List(_))));
}

#[tokio::test]
async fn test_lookup_maps_not_found_to_absent() {
    let (base, _script) = serve(vec![Canned::new(404, ""), Canned::new(200, "7")]).await;
    let exec = executor(Duration::from_millis(10));
    let req = ApiRequest::get(format!("{base}/entry"));

    assert_eq!(exec.lookup(&req).await.unwrap(), Lookup::Absent);
    assert!(matches!(exec.lookup(&req).await.unwrap(), Lookup::Found(ResponseBody::Json(_))));
}

#[tokio::test]
async fn test_request_shape_reaches_server() {
    let (base, script) = serve(vec![Canned::new(200, r#"{"version":"1"}"#)]).await;

    let req = ApiRequest::post(format!("{base}/entries/entry"))
        .query("datastoreName", "Players")
        .query("entryKey", "p 1")
        .header("roblox-entry-metadata", "e30=")
        .raw(br#"{"coins":5}"#.to_vec(), "application/json");
    executor(Duration::from_millis(10)).execute(&req).await.unwrap();

    let hit = &script.hits()[0];
    assert_eq!(hit.method, Method::POST);
    assert!(hit.uri.starts_with("/entries/entry?datastoreName=Players&entryKey=p+1"));
    assert_eq!(hit.headers.get("content-type").unwrap(), "application/json");
    assert_eq!(hit.headers.get("roblox-entry-metadata").unwrap(), "e30=");
    assert_eq!(hit.body, r#"{"coins":5}"#);
}

#[tokio::test]
async fn test_transport_failure_after_retries() {
    // Reserve a port, then close it so connections are refused
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let started = Instant::now();
    let err = executor(Duration::from_millis(20))
        .execute(&ApiRequest::get(format!("http://{addr}/x")))
        .await
        .unwrap_err();

    match err {
        ClientError::Transport { attempts, url, .. } => {
            assert_eq!(attempts, 3);
            assert!(url.ends_with("/x"));
        }
        other => panic!("unexpected: {other:?}"),
    }
    // 20ms then 40ms of backoff between the three attempts
    assert!(started.elapsed() >= Duration::from_millis(60));
}

#[tokio::test]
async fn test_transport_failure_then_recovery() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    // The server comes back on the same port well before the second attempt
    let revived = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        serve_on(listener, vec![Canned::new(200, r#"{"back":true}"#)])
    });

    let started = Instant::now();
    let body = executor(Duration::from_millis(300))
        .execute(&ApiRequest::get(format!("http://{addr}/x")))
        .await
        .unwrap();

    assert_eq!(
        body,
        ResponseBody::Json(RemoteValue::from(serde_json::json!({"back": true})))
    );
    assert!(started.elapsed() >= Duration::from_millis(300));
    let script = revived.await.unwrap();
    assert_eq!(script.hits().len(), 1);
}
