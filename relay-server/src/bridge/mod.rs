//! Correlation bridge between tool callers and the studio plugin
//!
//! The plugin can only poll for work and push results back on a separate
//! request. The bridge turns that pair of one-way channels into a call:
//!
//! ```text
//! caller ──submit──▶ [queue] ──GET /plugin_command──▶ plugin
//!    ▲                                                  │
//!    └──── oneshot ◀── [pending] ◀──POST /plugin_report_result
//! ```
//!
//! Queue and pending map sit behind one mutex and every touch is a short
//! critical section; the caller's wait happens outside the lock on its own
//! oneshot receiver. A pending slot is registered in the same critical
//! section that enqueues the command, so a result always has somewhere to
//! land, and it is removed on every exit path of `submit` (result, timeout,
//! or the caller's future being dropped).

mod error;

pub use error::{BridgeError, BridgeResult};

use parking_lot::Mutex;
use shared::{PluginCommand, RemoteValue};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

struct QueuedCommand {
    command: PluginCommand,
    enqueued_at: Instant,
}

struct PendingSlot {
    tx: oneshot::Sender<RemoteValue>,
    action: String,
    registered_at: Instant,
}

#[derive(Default)]
struct BridgeInner {
    queue: VecDeque<QueuedCommand>,
    pending: HashMap<String, PendingSlot>,
}

#[derive(Default)]
pub struct Bridge {
    inner: Mutex<BridgeInner>,
}

/// Removes the slot when `submit` returns or is dropped mid-wait
struct SlotGuard<'a> {
    bridge: &'a Bridge,
    request_id: String,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.bridge.inner.lock().pending.remove(&self.request_id);
    }
}

impl Bridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `action` for the plugin and wait up to `timeout` for its result.
    ///
    /// The returned value is whatever the plugin reported, including
    /// application-level error payloads.
    pub async fn submit(
        &self,
        action: impl Into<String>,
        payload: RemoteValue,
        timeout: Duration,
    ) -> BridgeResult<RemoteValue> {
        let action = action.into();
        let request_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        let now = Instant::now();

        {
            let mut inner = self.inner.lock();
            inner.pending.insert(
                request_id.clone(),
                PendingSlot {
                    tx,
                    action: action.clone(),
                    registered_at: now,
                },
            );
            inner.queue.push_back(QueuedCommand {
                command: PluginCommand::new(action.clone(), payload).with_request_id(&request_id),
                enqueued_at: now,
            });
        }
        let _guard = SlotGuard {
            bridge: self,
            request_id: request_id.clone(),
        };
        tracing::debug!(request_id = %request_id, action = %action, "Command queued for plugin");

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(value)) => {
                tracing::debug!(
                    request_id = %request_id,
                    elapsed_ms = now.elapsed().as_millis() as u64,
                    "Plugin result received"
                );
                Ok(value)
            }
            Ok(Err(_)) => Err(BridgeError::Abandoned { request_id }),
            Err(_) => {
                let elapsed = now.elapsed();
                tracing::warn!(
                    request_id = %request_id,
                    action = %action,
                    elapsed_secs = elapsed.as_secs_f64(),
                    "Timed out waiting for plugin result"
                );
                Err(BridgeError::Timeout {
                    request_id,
                    action,
                    elapsed,
                })
            }
        }
    }

    /// Queue a command that expects no result. Returns the queue length.
    pub fn enqueue_detached(&self, action: impl Into<String>, payload: RemoteValue) -> usize {
        self.enqueue_batch(vec![PluginCommand::new(action, payload)])
    }

    /// Queue several result-less commands back to back. Returns the queue length.
    pub fn enqueue_batch(&self, commands: Vec<PluginCommand>) -> usize {
        let now = Instant::now();
        let count = commands.len();
        let mut inner = self.inner.lock();
        inner.queue.extend(commands.into_iter().map(|mut command| {
            command.request_id = None;
            QueuedCommand {
                command,
                enqueued_at: now,
            }
        }));
        let len = inner.queue.len();
        drop(inner);
        tracing::debug!(count, queued = len, "Detached commands queued");
        len
    }

    /// Pop the oldest queued command. Each command is handed out at most once.
    pub fn next_command(&self) -> Option<PluginCommand> {
        let queued = self.inner.lock().queue.pop_front()?;
        tracing::debug!(
            request_id = queued.command.request_id.as_deref().unwrap_or("-"),
            action = %queued.command.action,
            waited_ms = queued.enqueued_at.elapsed().as_millis() as u64,
            "Command dispatched to plugin"
        );
        Some(queued.command)
    }

    /// Deliver a result to the waiting caller.
    ///
    /// An unknown id leaves all state untouched and yields
    /// [`BridgeError::UnknownCorrelation`]; callers treat it as non-fatal.
    pub fn report_result(&self, request_id: &str, value: RemoteValue) -> BridgeResult<()> {
        let slot = self.inner.lock().pending.remove(request_id);
        let Some(slot) = slot else {
            tracing::warn!(request_id = %request_id, "Result reported for unknown or expired request");
            return Err(BridgeError::UnknownCorrelation {
                request_id: request_id.to_string(),
            });
        };

        tracing::debug!(
            request_id = %request_id,
            action = %slot.action,
            waited_ms = slot.registered_at.elapsed().as_millis() as u64,
            "Plugin result resolved"
        );
        if slot.tx.send(value).is_err() {
            // Caller gave up between removal and delivery
            tracing::debug!(request_id = %request_id, "Caller no longer waiting");
        }
        Ok(())
    }

    /// Drop every pending slot; waiting callers fail with [`BridgeError::Abandoned`]
    pub fn abandon_pending(&self) -> usize {
        let drained: Vec<_> = self.inner.lock().pending.drain().collect();
        if !drained.is_empty() {
            tracing::info!(count = drained.len(), "Abandoned pending plugin requests");
        }
        drained.len()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn queued_count(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn is_pending(&self, request_id: &str) -> bool {
        self.inner.lock().pending.contains_key(request_id)
    }
}
