//! Resilient HTTP executor
//!
//! One logical request, several physical attempts. Only rate limiting (429)
//! and network-level failures are retried; every other error status fails
//! immediately with the remote body preserved.

use crate::error::{ClientError, ClientResult, Lookup, absent_on_not_found};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode};
use shared::RemoteValue;
use std::time::Duration;

/// Default number of physical attempts per logical request
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default first backoff delay
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Retry budget shared by the rate-limit and network-failure paths
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
        }
    }
}

/// Request body variants
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    /// Pre-encoded bytes sent as-is
    Raw {
        bytes: Vec<u8>,
        content_type: String,
    },
}

/// A request description, reusable across retry attempts
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    /// Overrides the executor's default timeout
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Add a query parameter only when a value is present
    pub fn query_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn raw(mut self, bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        self.body = RequestBody::Raw {
            bytes,
            content_type: content_type.into(),
        };
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Parsed body of a successful (or failed) response
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// 204 or a zero-length body
    Empty,
    Json(RemoteValue),
    /// Body that is not JSON; a degraded but valid result
    Text(String),
}

impl ResponseBody {
    /// Classify a raw body
    pub fn parse(status: StatusCode, text: &str) -> Self {
        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Self::Empty;
        }
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(value) => Self::Json(RemoteValue::from(value)),
            Err(_) => Self::Text(text.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_json(&self) -> Option<&RemoteValue> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Collapse into a [`RemoteValue`]; an empty body becomes `{}`
    pub fn into_value(self) -> RemoteValue {
        match self {
            Self::Empty => RemoteValue::empty_map(),
            Self::Json(v) => v,
            Self::Text(s) => RemoteValue::text(s),
        }
    }
}

/// Executes a request to completion, retrying where the policy allows
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, request: &ApiRequest) -> ClientResult<ResponseBody>;

    /// Like [`Executor::execute`], but a 404 is a successful "absent" answer
    async fn lookup(&self, request: &ApiRequest) -> ClientResult<Lookup<ResponseBody>> {
        absent_on_not_found(self.execute(request).await)
    }
}

/// What a single physical attempt produced
enum Attempt {
    Done(ResponseBody),
    RateLimited(Option<Duration>),
    Network(String),
    Failed(ClientError),
}

/// reqwest-backed [`Executor`]
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
    retry: RetryPolicy,
}

impl HttpExecutor {
    /// Build an executor that authenticates every request with `api_key`
    pub fn new(api_key: &str, timeout: Duration, retry: RetryPolicy) -> ClientResult<Self> {
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| ClientError::Config("API key is not a valid header value".into()))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, retry })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    async fn attempt(&self, request: &ApiRequest) -> Attempt {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Raw {
                bytes,
                content_type,
            } => builder
                .header(CONTENT_TYPE, content_type.as_str())
                .body(bytes.clone()),
        };

        let response = match builder.send().await {
            Ok(r) => r,
            Err(e) => return Attempt::Network(e.to_string()),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Attempt::RateLimited(parse_retry_after(response.headers()));
        }

        let text = match response.text().await {
            Ok(t) => t,
            Err(e) => return Attempt::Network(e.to_string()),
        };

        if status.is_success() {
            Attempt::Done(ResponseBody::parse(status, &text))
        } else {
            Attempt::Failed(remote_error(status, &text))
        }
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn execute(&self, request: &ApiRequest) -> ClientResult<ResponseBody> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut retry_delay = self.retry.initial_delay;
        let mut attempt = 0;

        loop {
            attempt += 1;
            tracing::debug!(method = %request.method, url = %request.url, attempt, "Sending request");

            match self.attempt(request).await {
                Attempt::Done(body) => return Ok(body),
                Attempt::Failed(err) => {
                    tracing::debug!(url = %request.url, error = %err, "Request failed");
                    return Err(err);
                }
                Attempt::RateLimited(server_delay) => {
                    if attempt >= max_attempts {
                        tracing::error!(url = %request.url, attempts = attempt, "Rate limit retries exhausted");
                        return Err(ClientError::RateLimited {
                            url: request.url.clone(),
                            attempts: attempt,
                        });
                    }
                    let delay = server_delay.unwrap_or(retry_delay);
                    tracing::warn!(
                        url = %request.url,
                        attempt,
                        delay_secs = delay.as_secs_f64(),
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    retry_delay = (retry_delay * 2).max(delay);
                }
                Attempt::Network(message) => {
                    if attempt >= max_attempts {
                        tracing::error!(url = %request.url, attempts = attempt, error = %message, "Network retries exhausted");
                        return Err(ClientError::Transport {
                            url: request.url.clone(),
                            attempts: attempt,
                            message,
                        });
                    }
                    tracing::warn!(
                        url = %request.url,
                        attempt,
                        delay_secs = retry_delay.as_secs_f64(),
                        error = %message,
                        "Network error, retrying"
                    );
                    tokio::time::sleep(retry_delay).await;
                    retry_delay *= 2;
                }
            }
        }
    }
}

/// `Retry-After` in (possibly fractional) seconds, clamped at zero.
/// The HTTP-date form is not used by the cloud API and is ignored, as is
/// any value too large to represent as a `Duration`.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs: f64 = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs.max(0.0)).ok()
}

fn remote_error(status: StatusCode, text: &str) -> ClientError {
    let body = ResponseBody::parse(status, text);
    let message = match &body {
        ResponseBody::Json(value) => value
            .field("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        ResponseBody::Text(raw) => raw.clone(),
        ResponseBody::Empty => status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string(),
    };
    ClientError::Remote {
        status: status.as_u16(),
        message,
        body,
    }
}
