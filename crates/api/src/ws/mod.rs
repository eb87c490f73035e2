//! WebSocket hubs for real-time delivery.
//!
//! Two independent [`WsManager`] instances back the job-status and
//! content/discussion channels. Both share the upgrade handler, heartbeat
//! and shutdown logic.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::{content_ws_handler, job_ws_handler};
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
