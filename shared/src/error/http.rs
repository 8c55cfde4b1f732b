//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,

            // Remote answered but with a failure of its own
            Self::RemoteError | Self::OperationFailed | Self::InvalidResponse => {
                StatusCode::BAD_GATEWAY
            }

            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,

            // Transient, caller may retry later
            Self::TransportError | Self::RemoteUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            Self::UnknownCorrelation => StatusCode::CONFLICT,

            Self::InternalError | Self::ConfigError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
