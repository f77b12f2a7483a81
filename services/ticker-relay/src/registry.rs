//! Connected subscriber registry and best-effort broadcast
//!
//! The membership set is guarded by a single mutex; `add`, `remove`, and
//! `snapshot` are the only ways in, so concurrent connection handlers and
//! the broadcasting loops stay linearizable with respect to each other.
//! None of the operations touch the network: a `ClientHandle` only carries
//! the client's pending-send channel, while the socket itself stays owned by
//! the connection handler that created it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes};
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use types::message::RelayMessage;

pub type ClientId = u64;

/// Handle to one connected subscriber: its id plus pending-send channel.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    pub id: ClientId,
    tx: UnboundedSender<Message>,
}

impl ClientHandle {
    /// Queue a message for this client. Returns `false` if the client's
    /// forward task is gone; the caller must not treat that as fatal.
    pub fn send(&self, msg: Message) -> bool {
        self.tx.send(msg).is_ok()
    }
}

/// Process-wide set of connected subscribers.
#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<ClientId, ClientHandle>>,
    next_id: AtomicU64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a handle for a new connection around its send channel.
    pub fn new_handle(&self, tx: UnboundedSender<Message>) -> ClientHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        ClientHandle { id, tx }
    }

    /// Insert a client; idempotent if already present. Returns the registry
    /// size after insertion.
    pub fn add(&self, handle: ClientHandle) -> usize {
        let mut clients = self.clients.lock();
        clients.insert(handle.id, handle);
        clients.len()
    }

    /// Remove a client if present, no-op otherwise. Returns the registry
    /// size after removal.
    pub fn remove(&self, id: ClientId) -> usize {
        let mut clients = self.clients.lock();
        clients.remove(&id);
        clients.len()
    }

    /// Point-in-time copy of current membership, safe to iterate while
    /// add/remove continue concurrently.
    pub fn snapshot(&self) -> Vec<ClientHandle> {
        self.clients.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }

    /// Deliver one payload to every registered subscriber.
    ///
    /// The payload is serialized once; a failed queue push on one client
    /// never blocks or fails delivery to any other. Cleanup of dead clients
    /// belongs to their own connection handlers.
    pub fn broadcast(&self, msg: &RelayMessage) {
        let clients = self.snapshot();
        if clients.is_empty() {
            return;
        }

        let text = match serde_json::to_string(msg) {
            Ok(text) => Utf8Bytes::from(text),
            Err(err) => {
                warn!(%err, "failed to serialize broadcast payload");
                return;
            }
        };

        for client in clients {
            if !client.send(Message::Text(text.clone())) {
                debug!(client_id = client.id, "skipping send to closed client");
            }
        }
    }
}

/// Scoped registration: pairs `add` on construction with a guaranteed
/// `remove` on drop, so deregistration runs on every exit path of a
/// connection handler, including cancellation.
pub struct RegistrationGuard {
    registry: Arc<ClientRegistry>,
    id: ClientId,
}

impl RegistrationGuard {
    pub fn register(registry: Arc<ClientRegistry>, handle: ClientHandle) -> Self {
        let id = handle.id;
        let connected = registry.add(handle);
        info!(client_id = id, connected, "client registered");
        Self { registry, id }
    }

    pub fn client_id(&self) -> ClientId {
        self.id
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        let connected = self.registry.remove(self.id);
        info!(client_id = self.id, connected, "client deregistered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn handle_pair(
        registry: &ClientRegistry,
    ) -> (ClientHandle, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (registry.new_handle(tx), rx)
    }

    #[test]
    fn test_add_remove_counts() {
        let registry = ClientRegistry::new();
        let (a, _rx_a) = handle_pair(&registry);
        let (b, _rx_b) = handle_pair(&registry);
        let a_id = a.id;

        assert_eq!(registry.add(a), 1);
        assert_eq!(registry.add(b), 2);
        assert_eq!(registry.remove(a_id), 1);
        // Removing an absent client is a no-op.
        assert_eq!(registry.remove(a_id), 1);
    }

    #[test]
    fn test_add_is_idempotent() {
        let registry = ClientRegistry::new();
        let (a, _rx) = handle_pair(&registry);
        assert_eq!(registry.add(a.clone()), 1);
        assert_eq!(registry.add(a), 1);
    }

    #[test]
    fn test_snapshot_is_point_in_time_copy() {
        let registry = ClientRegistry::new();
        let (a, _rx) = handle_pair(&registry);
        let a_id = a.id;
        registry.add(a);

        let snapshot = registry.snapshot();
        registry.remove(a_id);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_broadcast_reaches_all_clients() {
        let registry = ClientRegistry::new();
        let (a, mut rx_a) = handle_pair(&registry);
        let (b, mut rx_b) = handle_pair(&registry);
        registry.add(a);
        registry.add(b);

        registry.broadcast(&RelayMessage::Heartbeat {
            timestamp: "2024-03-01T12:00:00.000Z".to_string(),
        });

        assert!(matches!(rx_a.try_recv(), Ok(Message::Text(_))));
        assert!(matches!(rx_b.try_recv(), Ok(Message::Text(_))));
    }

    #[test]
    fn test_dead_client_does_not_block_others() {
        let registry = ClientRegistry::new();
        let (dead, rx_dead) = handle_pair(&registry);
        let (live, mut rx_live) = handle_pair(&registry);
        registry.add(dead);
        registry.add(live);
        drop(rx_dead); // the dead client's forward task is gone

        registry.broadcast(&RelayMessage::error("DB_POLLING_FAILED", "down"));

        assert!(matches!(rx_live.try_recv(), Ok(Message::Text(_))));
    }

    #[test]
    fn test_guard_deregisters_on_drop() {
        let registry = Arc::new(ClientRegistry::new());
        let (a, _rx) = handle_pair(&registry);
        {
            let _guard = RegistrationGuard::register(registry.clone(), a);
            assert_eq!(registry.len(), 1);
        }
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn test_counts_match_membership_under_concurrent_churn() {
        let registry = Arc::new(ClientRegistry::new());
        let mut tasks = Vec::new();
        for _ in 0..32 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let (tx, _rx) = mpsc::unbounded_channel();
                let handle = registry.new_handle(tx);
                let id = handle.id;
                let after_add = registry.add(handle);
                assert!(after_add >= 1 && after_add <= 32);
                tokio::task::yield_now().await;
                registry.remove(id);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(registry.len(), 0);
    }
}
