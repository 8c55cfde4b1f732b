use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// No result arrived within the caller's timeout
    #[error("no result for '{action}' ({request_id}) after {:.1}s", .elapsed.as_secs_f64())]
    Timeout {
        request_id: String,
        action: String,
        elapsed: Duration,
    },

    /// A result was reported for an id that is not pending (already
    /// resolved, timed out, or never issued)
    #[error("no pending request with id {request_id}")]
    UnknownCorrelation { request_id: String },

    /// The pending slot was dropped without a result, e.g. on shutdown
    #[error("request {request_id} was abandoned before a result arrived")]
    Abandoned { request_id: String },
}

pub type BridgeResult<T> = Result<T, BridgeError>;
