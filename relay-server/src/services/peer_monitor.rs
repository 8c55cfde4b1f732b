//! Studio plugin connection tracking
//!
//! The plugin never holds a connection open, so "connected" means it has
//! polled recently. Every request is attributed to a `(peer ip, channel)`
//! pair; a background sweep evicts pairs that have gone quiet.

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Which plugin channel a request belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Polling,
    ResultReporting,
    LogForwarding,
    Other,
}

impl Channel {
    pub fn from_path(path: &str) -> Self {
        match path {
            "/plugin_command" => Self::Polling,
            "/plugin_report_result" => Self::ResultReporting,
            "/receive_studio_logs" => Self::LogForwarding,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Polling => "polling",
            Self::ResultReporting => "result_reporting",
            Self::LogForwarding => "log_forwarding",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

#[derive(Debug)]
pub struct PeerMonitor {
    idle_timeout: Duration,
    peers: Mutex<HashMap<(String, Channel), Instant>>,
}

impl PeerMonitor {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            peers: Mutex::new(HashMap::new()),
        }
    }

    /// Record activity from `peer` on `channel`
    pub fn touch(&self, peer: &str, channel: Channel) {
        let now = Instant::now();
        let is_new = self
            .peers
            .lock()
            .insert((peer.to_string(), channel), now)
            .is_none();

        if is_new {
            if channel == Channel::Polling {
                tracing::info!(peer = %peer, "Studio plugin connected");
            } else {
                tracing::debug!(peer = %peer, channel = %channel, "New studio peer activity");
            }
        }
    }

    /// Evict entries idle longer than the timeout. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut expired = Vec::new();
        self.peers.lock().retain(|key, last_seen| {
            let alive = now.duration_since(*last_seen) <= self.idle_timeout;
            if !alive {
                expired.push(key.clone());
            }
            alive
        });

        for (peer, channel) in &expired {
            if *channel == Channel::Polling {
                tracing::warn!(peer = %peer, "Studio plugin disabled or disconnected");
            } else {
                tracing::debug!(peer = %peer, channel = %channel, "Studio peer idle, evicted");
            }
        }
        expired.len()
    }

    /// Whether any peer has polled within the idle timeout
    pub fn plugin_connected(&self) -> bool {
        self.peers
            .lock()
            .keys()
            .any(|(_, channel)| *channel == Channel::Polling)
    }

    pub fn tracked(&self) -> usize {
        self.peers.lock().len()
    }

    /// Sweep once per [`SWEEP_INTERVAL`] until `shutdown` fires
    pub async fn run_sweeper(self: Arc<Self>, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep();
                }
                _ = shutdown.cancelled() => {
                    tracing::debug!("Peer monitor sweep stopped");
                    return;
                }
            }
        }
    }
}

impl Default for PeerMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT)
    }
}

/// Peer IP: X-Forwarded-For first entry, then the socket address
fn peer_ip(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
        && let Some(first) = val.split(',').next()
    {
        let ip = first.trim();
        if !ip.is_empty() {
            return ip.to_owned();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

/// Middleware recording every request against the monitor
pub async fn track_peer(
    State(monitor): State<Arc<PeerMonitor>>,
    request: Request,
    next: Next,
) -> Response {
    let channel = Channel::from_path(request.uri().path());
    monitor.touch(&peer_ip(&request), channel);
    next.run(request).await
}
