//! Long-running operation poller
//!
//! Polls an operation resource until it reports a terminal state or the
//! caller's deadline passes. The interval grows geometrically up to a cap,
//! and the last sleep is trimmed to the remaining budget so no request is
//! ever issued after the deadline. A status fetch still in flight when the
//! deadline passes is abandoned.

use crate::error::{ClientError, ClientResult};
use crate::http::{ApiRequest, Executor, ResponseBody};
use shared::OperationStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Poll interval schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            multiplier: 1.5,
            max_interval: Duration::from_secs(5),
        }
    }
}

impl PollPolicy {
    pub fn next_interval(&self, current: Duration) -> Duration {
        current.mul_f64(self.multiplier).min(self.max_interval)
    }
}

/// A terminal status together with what it took to observe it
#[derive(Debug, Clone)]
pub struct TerminalStatus {
    pub status: OperationStatus,
    pub polls: u32,
    pub elapsed: Duration,
}

pub struct OperationPoller {
    executor: Arc<dyn Executor>,
    base_url: String,
    policy: PollPolicy,
}

impl OperationPoller {
    /// `base_url` is the prefix operation paths are resolved against
    pub fn new(executor: Arc<dyn Executor>, base_url: impl Into<String>) -> Self {
        Self {
            executor,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            policy: PollPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn status_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Poll `path` until terminal or until `overall_timeout` elapses.
    ///
    /// Executor failures propagate unchanged.
    pub async fn poll(&self, path: &str, overall_timeout: Duration) -> ClientResult<TerminalStatus> {
        let started = Instant::now();
        let deadline = started + overall_timeout;
        let request = ApiRequest::get(self.status_url(path));
        let mut interval = self.policy.initial_interval;
        let mut polls = 0u32;

        while Instant::now() < deadline {
            // A single fetch may back off on 429; it still must not outlive the deadline
            let Ok(fetched) = tokio::time::timeout_at(deadline, self.executor.execute(&request)).await
            else {
                break;
            };
            let body = fetched?;
            polls += 1;

            let status = parse_status(path, &body)?;
            if status.is_terminal() {
                tracing::debug!(
                    operation = %path,
                    state = ?status.effective_state(),
                    polls,
                    "Operation reached terminal state"
                );
                return Ok(TerminalStatus {
                    status,
                    polls,
                    elapsed: started.elapsed(),
                });
            }

            tracing::trace!(operation = %path, state = ?status.state, polls, "Operation in progress");

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(interval.min(remaining)).await;
            interval = self.policy.next_interval(interval);
        }

        let elapsed = started.elapsed();
        tracing::warn!(operation = %path, polls, elapsed_secs = elapsed.as_secs_f64(), "Operation poll timed out");
        Err(ClientError::Timeout {
            context: format!("operation {path}"),
            elapsed,
        })
    }
}

fn parse_status(path: &str, body: &ResponseBody) -> ClientResult<OperationStatus> {
    match body {
        ResponseBody::Json(value) => OperationStatus::from_value(value).map_err(|e| {
            ClientError::InvalidResponse(format!("operation {path} status: {e}"))
        }),
        // Nothing reported yet
        ResponseBody::Empty => Ok(OperationStatus::default()),
        ResponseBody::Text(_) => Err(ClientError::InvalidResponse(format!(
            "operation {path} status is not JSON"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shared::{OperationState, RemoteValue};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned outcomes and records when each request was made
    struct ScriptedExecutor {
        script: Mutex<VecDeque<ClientResult<ResponseBody>>>,
        fallback: serde_json::Value,
        calls: Mutex<Vec<(String, Instant)>>,
    }

    impl ScriptedExecutor {
        fn new(script: Vec<ClientResult<ResponseBody>>, fallback: serde_json::Value) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
        }

        fn urls(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(u, _)| u.clone()).collect()
        }
    }

    #[async_trait]
    impl Executor for ScriptedExecutor {
        async fn execute(&self, request: &ApiRequest) -> ClientResult<ResponseBody> {
            self.calls
                .lock()
                .unwrap()
                .push((request.url.clone(), Instant::now()));
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(json_body(self.fallback.clone())))
        }
    }

    fn json_body(v: serde_json::Value) -> ResponseBody {
        ResponseBody::Json(RemoteValue::from(v))
    }

    fn state(s: &str) -> ClientResult<ResponseBody> {
        Ok(json_body(json!({"path": "ops/1", "state": s})))
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_on_third_poll() {
        let exec = ScriptedExecutor::new(
            vec![state("RUNNING"), state("RUNNING"), state("COMPLETE")],
            json!({"state": "RUNNING"}),
        );
        let poller = OperationPoller::new(exec.clone(), "https://cloud.test/v2/");

        let done = poller.poll("ops/1", Duration::from_secs(60)).await.unwrap();

        assert_eq!(done.polls, 3);
        assert_eq!(done.status.state, Some(OperationState::Complete));
        assert_eq!(exec.call_times().len(), 3);
        assert_eq!(exec.urls()[0], "https://cloud.test/v2/ops/1");
        // 1.0s then 1.5s between polls
        assert_eq!(done.elapsed, Duration::from_millis(2500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_without_polling_past_deadline() {
        let exec = ScriptedExecutor::new(vec![], json!({"state": "RUNNING"}));
        let poller = OperationPoller::new(exec.clone(), "https://cloud.test/v2");
        let started = Instant::now();
        let timeout = Duration::from_secs(3);

        let err = poller.poll("ops/slow", timeout).await.unwrap_err();

        match err {
            ClientError::Timeout { context, elapsed } => {
                assert_eq!(context, "operation ops/slow");
                assert!(elapsed >= timeout);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        let times = exec.call_times();
        // t = 0, 1.0, 2.5; the next would be at 4.75
        assert_eq!(times.len(), 3);
        assert!(times.iter().all(|t| *t < started + timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_payload_is_terminal() {
        let exec = ScriptedExecutor::new(
            vec![
                state("RUNNING"),
                Ok(json_body(json!({"state": "RUNNING", "error": {"message": "script error"}}))),
            ],
            json!({"state": "RUNNING"}),
        );
        let poller = OperationPoller::new(exec.clone(), "https://cloud.test/v2");

        let done = poller.poll("ops/1", Duration::from_secs(60)).await.unwrap();

        assert_eq!(done.polls, 2);
        assert_eq!(done.status.effective_state(), Some(OperationState::Failed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_is_capped() {
        let exec = ScriptedExecutor::new(vec![], json!({"state": "PENDING"}));
        let poller = OperationPoller::new(exec.clone(), "https://cloud.test/v2");

        let _ = poller.poll("ops/1", Duration::from_secs(30)).await;

        let times = exec.call_times();
        let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(gaps[0], Duration::from_millis(1000));
        assert_eq!(gaps[1], Duration::from_millis(1500));
        assert_eq!(gaps[2], Duration::from_millis(2250));
        assert!(gaps.iter().all(|g| *g <= Duration::from_secs(5)));
        assert!(gaps.contains(&Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_executor_errors_propagate() {
        let exec = ScriptedExecutor::new(
            vec![
                state("RUNNING"),
                Err(ClientError::Remote {
                    status: 500,
                    message: "boom".into(),
                    body: ResponseBody::Text("boom".into()),
                }),
            ],
            json!({"state": "RUNNING"}),
        );
        let poller = OperationPoller::new(exec.clone(), "https://cloud.test/v2");

        let err = poller.poll("ops/1", Duration::from_secs(60)).await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(exec.call_times().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_status_is_invalid() {
        let exec = ScriptedExecutor::new(
            vec![Ok(ResponseBody::Text("<html>".into()))],
            json!({}),
        );
        let poller = OperationPoller::new(exec, "https://cloud.test/v2");

        let err = poller.poll("ops/1", Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse(_)));
    }

    /// Every fetch stalls for `stall` before answering RUNNING
    struct StallingExecutor {
        stall: Duration,
    }

    #[async_trait]
    impl Executor for StallingExecutor {
        async fn execute(&self, _request: &ApiRequest) -> ClientResult<ResponseBody> {
            tokio::time::sleep(self.stall).await;
            Ok(json_body(json!({"state": "RUNNING"})))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_does_not_overrun_deadline() {
        let exec = Arc::new(StallingExecutor {
            stall: Duration::from_secs(4),
        });
        let poller = OperationPoller::new(exec, "https://cloud.test/v2");
        let started = Instant::now();

        let err = poller.poll("ops/1", Duration::from_secs(1)).await.unwrap_err();

        assert!(matches!(err, ClientError::Timeout { .. }));
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }

    #[test]
    fn test_next_interval() {
        let policy = PollPolicy::default();
        assert_eq!(policy.next_interval(Duration::from_secs(1)), Duration::from_millis(1500));
        assert_eq!(policy.next_interval(Duration::from_secs(4)), Duration::from_secs(5));
    }
}
