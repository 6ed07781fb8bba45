use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// Outbound delivery to connected clients, keyed by client id. Sends to
/// unknown or disconnected clients are dropped silently; the room never
/// blocks on a slow socket.
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    async fn add_connection(&self, client_id: String, sender: mpsc::UnboundedSender<String>);

    async fn remove_connection(&self, client_id: &str);

    async fn send_to_client(&self, client_id: &str, message: &str);

    async fn send_to_clients(&self, client_ids: &[String], message: &str);
}

pub struct InMemoryConnectionManager {
    connections: Arc<RwLock<HashMap<String, mpsc::UnboundedSender<String>>>>,
}

impl InMemoryConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionManager for InMemoryConnectionManager {
    async fn add_connection(&self, client_id: String, sender: mpsc::UnboundedSender<String>) {
        debug!(client_id = %client_id, "Connection registered");
        self.connections.write().await.insert(client_id, sender);
    }

    async fn remove_connection(&self, client_id: &str) {
        if self.connections.write().await.remove(client_id).is_some() {
            debug!(client_id = %client_id, "Connection removed");
        }
    }

    async fn send_to_client(&self, client_id: &str, message: &str) {
        let connections = self.connections.read().await;
        if let Some(sender) = connections.get(client_id) {
            if sender.send(message.to_string()).is_err() {
                debug!(client_id = %client_id, "Send to mid-disconnect client dropped");
            }
        }
    }

    async fn send_to_clients(&self, client_ids: &[String], message: &str) {
        let connections = self.connections.read().await;
        for client_id in client_ids {
            if let Some(sender) = connections.get(client_id) {
                let _ = sender.send(message.to_string());
            }
        }
    }
}
