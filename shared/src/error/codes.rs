//! Unified error codes for the relay
//!
//! Error codes are organized by category:
//! - 0: Success
//! - 7xxx: Remote execution errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so tool clients can
/// branch on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    /// Operation completed successfully
    Success = 0,

    // ==================== 7xxx: Remote execution ====================
    /// Network failure after retries were exhausted
    TransportError = 7001,
    /// Remote kept answering 429 until the retry budget ran out
    RateLimited = 7002,
    /// Non-retryable HTTP error from the remote
    RemoteError = 7003,
    /// A bounded wait expired
    Timeout = 7004,
    /// A result arrived for an id that is no longer pending
    UnknownCorrelation = 7005,
    /// The remote operation reached a failed or cancelled state
    OperationFailed = 7006,
    /// The remote answered with something that could not be interpreted
    InvalidResponse = 7007,
    /// The requested remote is not configured
    RemoteUnavailable = 7008,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Numeric value of this code
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Default human-readable message
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Operation completed successfully",

            ErrorCode::TransportError => "Could not reach the remote service",
            ErrorCode::RateLimited => "Remote service rate limit exceeded",
            ErrorCode::RemoteError => "Remote service returned an error",
            ErrorCode::Timeout => "Timed out waiting for the remote",
            ErrorCode::UnknownCorrelation => "No pending request matches this id",
            ErrorCode::OperationFailed => "Remote operation failed",
            ErrorCode::InvalidResponse => "Unexpected response from the remote service",
            ErrorCode::RemoteUnavailable => "Remote target is not available",

            ErrorCode::InternalError => "Internal server error",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),

            7001 => Ok(ErrorCode::TransportError),
            7002 => Ok(ErrorCode::RateLimited),
            7003 => Ok(ErrorCode::RemoteError),
            7004 => Ok(ErrorCode::Timeout),
            7005 => Ok(ErrorCode::UnknownCorrelation),
            7006 => Ok(ErrorCode::OperationFailed),
            7007 => Ok(ErrorCode::InvalidResponse),
            7008 => Ok(ErrorCode::RemoteUnavailable),

            9001 => Ok(ErrorCode::InternalError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
