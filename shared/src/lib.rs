//! Shared types for the remote execution relay
//!
//! Wire types used by both the cloud client and the relay server:
//! payload values, the studio plugin protocol, cloud operation status,
//! and the unified error/response structures.

pub mod error;
pub mod operation;
pub mod plugin;
pub mod value;

// Re-exports
pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use operation::{OperationOutcome, OperationState, OperationStatus};
pub use plugin::{
    LogsAck, PluginCommand, PluginResultPayload, ReportAck, StudioLogEntry, StudioLogRecord,
};
pub use value::{RemoteValue, Scalar};
