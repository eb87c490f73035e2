use std::sync::Arc;
use std::time::Duration;

use crate::ws::manager::WsManager;

/// Interval between heartbeat pings (in seconds).
const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Spawn a background task that sends periodic Ping frames to every
/// connection of the given hubs.
///
/// The returned `JoinHandle` is aborted during shutdown.
pub fn start_heartbeat(hubs: Vec<Arc<WsManager>>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));

        loop {
            interval.tick().await;
            for hub in &hubs {
                let count = hub.connection_count().await;
                tracing::debug!(channel = hub.name(), count, "WebSocket heartbeat ping");
                hub.ping_all().await;
            }
        }
    })
}
