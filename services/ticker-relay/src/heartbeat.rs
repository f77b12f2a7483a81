//! Periodic liveness broadcast
//!
//! Independent of data activity; never touches the watermark or the cache.
//! Lets subscribers distinguish "no data" from "connection dead" and keeps
//! idle connections open through intermediate proxies.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use types::message::RelayMessage;

use crate::registry::ClientRegistry;

pub async fn heartbeat_loop(
    registry: Arc<ClientRegistry>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {
                registry.broadcast(&RelayMessage::heartbeat_now());
            }
        }
    }
    debug!("heartbeat loop stopped");
}
