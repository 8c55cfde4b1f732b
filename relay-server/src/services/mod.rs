//! Service layer
//!
//! - [`RemoteExecutor`] - studio and cloud execution behind one call
//! - [`StudioLogBuffer`] - recent studio output
//! - [`PeerMonitor`] - plugin connection tracking
//! - [`http`] - router assembly

pub mod executor;
pub mod http;
pub mod log_buffer;
pub mod peer_monitor;

pub use executor::{CloudCall, ExecuteError, RemoteCall, RemoteExecutor};
pub use log_buffer::StudioLogBuffer;
pub use peer_monitor::{Channel, PeerMonitor};
