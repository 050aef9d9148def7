use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use flowchat_types::events::ServerEvent;

use crate::error::GatewayError;

/// Handle to one live connection: the connection's id plus the channel that
/// feeds its send task. Cloning is cheap and does not extend the connection's
/// lifetime; a handle whose peer is gone just fails to deliver.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    conn_id: Uuid,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

impl ClientHandle {
    pub fn new(conn_id: Uuid, sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self { conn_id, sender }
    }

    pub fn conn_id(&self) -> Uuid {
        self.conn_id
    }

    /// Queue an event for delivery to this connection. The unbounded channel
    /// decouples fanout from the peer's write speed, so one slow recipient
    /// cannot stall the others.
    pub fn deliver(&self, identity: &str, event: ServerEvent) -> Result<(), GatewayError> {
        self.sender.send(event).map_err(|_| GatewayError::Transport {
            identity: identity.to_string(),
        })
    }
}

/// Maps authenticated identities to their live connection handles.
/// At most one active handle per identity; last register wins.
#[derive(Default)]
pub struct Registry {
    connections: RwLock<HashMap<String, ClientHandle>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `identity` to `handle`, replacing any existing mapping. The
    /// previous connection is not closed here; its own failure path detects
    /// it is stale.
    pub async fn register(&self, identity: &str, handle: ClientHandle) {
        self.connections
            .write()
            .await
            .insert(identity.to_string(), handle);
    }

    pub async fn resolve(&self, identity: &str) -> Option<ClientHandle> {
        self.connections.read().await.get(identity).cloned()
    }

    /// Remove the mapping for `identity`, but only if it still points at
    /// `conn_id`. A late-closing old connection must not evict the newer one
    /// that replaced it after a reconnect. Returns whether an entry was
    /// removed.
    pub async fn unregister(&self, identity: &str, conn_id: Uuid) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get(identity) {
            Some(handle) if handle.conn_id == conn_id => {
                connections.remove(identity);
                true
            }
            _ => false,
        }
    }

    /// Snapshot of all live connections for global fanout. Handles are cloned
    /// out of the lock, so iterating the result never observes connections
    /// registered or torn down afterwards.
    pub async fn all_live(&self) -> Vec<(String, ClientHandle)> {
        self.connections
            .read()
            .await
            .iter()
            .map(|(identity, handle)| (identity.clone(), handle.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> (ClientHandle, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ClientHandle::new(Uuid::new_v4(), tx), rx)
    }

    #[tokio::test]
    async fn last_register_wins() {
        let registry = Registry::new();
        let (first, _rx1) = handle();
        let (second, _rx2) = handle();

        registry.register("alice", first).await;
        registry.register("alice", second.clone()).await;

        let resolved = registry.resolve("alice").await.unwrap();
        assert_eq!(resolved.conn_id(), second.conn_id());
        assert_eq!(registry.all_live().await.len(), 1);
    }

    #[tokio::test]
    async fn stale_unregister_keeps_newer_connection() {
        let registry = Registry::new();
        let (old, _rx1) = handle();
        let (new, _rx2) = handle();
        let old_id = old.conn_id();

        registry.register("alice", old).await;
        registry.register("alice", new.clone()).await;

        // The old connection closes late; its unregister must be a no-op.
        assert!(!registry.unregister("alice", old_id).await);
        assert!(registry.resolve("alice").await.is_some());

        // The current connection's unregister removes the entry.
        assert!(registry.unregister("alice", new.conn_id()).await);
        assert!(registry.resolve("alice").await.is_none());
    }

    #[tokio::test]
    async fn snapshot_does_not_observe_later_changes() {
        let registry = Registry::new();
        let (a, _rx1) = handle();
        registry.register("alice", a).await;

        let snapshot = registry.all_live().await;

        let (b, _rx2) = handle();
        registry.register("bob", b).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0, "alice");
    }

    #[tokio::test]
    async fn deliver_to_closed_peer_is_a_transport_error() {
        let (handle, rx) = handle();
        drop(rx);
        let err = handle
            .deliver(
                "alice",
                ServerEvent::Typing {
                    sender: "bob".into(),
                    is_typing: true,
                },
            )
            .unwrap_err();
        assert!(matches!(err, GatewayError::Transport { .. }));
    }
}
