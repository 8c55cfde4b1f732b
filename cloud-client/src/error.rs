//! Client error types

use crate::http::ResponseBody;
use shared::{OperationState, RemoteValue};
use std::time::Duration;
use thiserror::Error;

/// Client error type
///
/// Each variant is one failure class a caller may want to react to
/// differently. Layers above the executor add context to these, never a
/// new classification.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network failure (connect, timeout, reset) that outlived the retry budget
    #[error("transport error after {attempts} attempt(s) to {url}: {message}")]
    Transport {
        url: String,
        attempts: u32,
        message: String,
    },

    /// Remote kept answering 429 until the retry budget ran out
    #[error("rate limited by {url} after {attempts} attempt(s)")]
    RateLimited { url: String, attempts: u32 },

    /// Non-retryable HTTP error; the body is kept for diagnostics
    #[error("HTTP {status}: {message}")]
    Remote {
        status: u16,
        message: String,
        body: ResponseBody,
    },

    /// A bounded wait expired without a terminal outcome
    #[error("timed out after {:.1}s waiting for {context}", .elapsed.as_secs_f64())]
    Timeout { context: String, elapsed: Duration },

    /// The operation reached a terminal state other than COMPLETE
    #[error("operation {path} ended in state {state}")]
    OperationFailed {
        path: String,
        state: OperationState,
        error: RemoteValue,
    },

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Missing or unusable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status of a remote error, if this is one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the remote answered 404
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Outcome of a lookup where the remote may confirm that nothing exists.
///
/// Absence is a successful answer, distinct from a failed call.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    Absent,
}

impl<T> Lookup<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(v) => Some(v),
            Self::Absent => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Found(v) => Lookup::Found(f(v)),
            Self::Absent => Lookup::Absent,
        }
    }
}

/// Turn a 404 into [`Lookup::Absent`], leaving every other outcome untouched
pub fn absent_on_not_found<T>(result: ClientResult<T>) -> ClientResult<Lookup<T>> {
    match result {
        Ok(v) => Ok(Lookup::Found(v)),
        Err(e) if e.is_not_found() => Ok(Lookup::Absent),
        Err(e) => Err(e),
    }
}
