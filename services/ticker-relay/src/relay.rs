//! Relay loop: snapshot store → cache → broadcast
//!
//! State machine: `BOOTSTRAPPING → POLLING → (ERROR → POLLING)*`, running
//! for the process lifetime or until the shutdown token fires.
//!
//! The watermark only advances after a record has been fully considered
//! (accepted-and-broadcast or rejected-and-skipped), in ascending timestamp
//! order. A store fetch failure leaves it untouched, so the next successful
//! fetch re-requests exactly the pending records: at-most-once delivery
//! per valid record, no gaps.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use types::message::RelayMessage;
use types::tick::TickerSnapshot;

use crate::cache::TickerCache;
use crate::config::Config;
use crate::registry::ClientRegistry;
use crate::store::{SnapshotStore, StoreError};

/// Subscriber-visible code for a failed store poll.
pub const DB_POLLING_FAILED: &str = "DB_POLLING_FAILED";

pub struct RelayLoop {
    store: Arc<dyn SnapshotStore>,
    registry: Arc<ClientRegistry>,
    cache: Arc<TickerCache>,
    symbol: String,
    poll_interval: Duration,
    error_retry: Duration,
    watermark: DateTime<Utc>,
    bootstrapped: bool,
}

impl RelayLoop {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        registry: Arc<ClientRegistry>,
        cache: Arc<TickerCache>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            registry,
            cache,
            symbol: config.symbol.clone(),
            poll_interval: config.poll_interval(),
            error_retry: config.error_retry(),
            watermark: DateTime::<Utc>::UNIX_EPOCH,
            bootstrapped: false,
        }
    }

    /// Timestamp below which every record has already been considered.
    pub fn watermark(&self) -> DateTime<Utc> {
        self.watermark
    }

    /// One-time startup step: seed watermark and cache from the most recent
    /// stored record, without broadcasting it. Subscribers never receive
    /// data that predates their connection; the cache is nonetheless warm
    /// for new joiners.
    pub async fn bootstrap(&mut self) -> Result<(), StoreError> {
        match self.store.fetch_latest().await? {
            Some(record) => {
                self.watermark = record.time;
                match TickerSnapshot::from_record(&self.symbol, &record) {
                    Ok(snapshot) => {
                        self.cache.set(snapshot);
                        info!(watermark = %self.watermark, "bootstrapped from latest stored record");
                    }
                    Err(err) => {
                        warn!(%err, time = %record.time, "latest stored record is invalid; cache stays cold");
                    }
                }
            }
            None => {
                info!("snapshot store is empty; watermark starts at epoch");
            }
        }
        self.bootstrapped = true;
        Ok(())
    }

    /// One poll cycle: fetch everything past the watermark and process it in
    /// ascending order. Returns how many snapshots were broadcast.
    pub async fn poll_once(&mut self) -> Result<usize, StoreError> {
        let records = self.store.fetch_after(self.watermark).await?;
        let mut delivered = 0;

        for record in records {
            match TickerSnapshot::from_record(&self.symbol, &record) {
                Ok(snapshot) => {
                    self.cache.set(snapshot.clone());
                    self.registry.broadcast(&RelayMessage::Ticker(snapshot));
                    delivered += 1;
                }
                Err(err) => {
                    // Permanently skipped; the watermark still advances.
                    debug!(%err, time = %record.time, "skipping malformed record");
                }
            }
            self.watermark = record.time;
        }

        Ok(delivered)
    }

    /// Run until cancelled. Fetch failures are broadcast as `error` events
    /// and retried on the shorter interval; nothing here is fatal.
    pub async fn run(mut self, shutdown: CancellationToken) {
        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let step = if self.bootstrapped {
                self.poll_once().await.map(Some)
            } else {
                self.bootstrap().await.map(|()| None)
            };

            let delay = match step {
                // Freshly bootstrapped: poll immediately.
                Ok(None) => continue,
                Ok(Some(delivered)) => {
                    if delivered > 0 {
                        debug!(delivered, watermark = %self.watermark, "broadcast batch complete");
                    }
                    self.poll_interval
                }
                Err(err) => {
                    warn!(%err, watermark = %self.watermark, "snapshot store fetch failed; will retry");
                    self.registry
                        .broadcast(&RelayMessage::error(DB_POLLING_FAILED, "ticker db polling failed"));
                    self.error_retry
                }
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        info!("relay loop stopped");
    }
}
