use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use scorebox::websockets::ConnectionManager;

// ============================================================================
// Mock Infrastructure
// ============================================================================

#[derive(Clone)]
pub struct MockConnectionManager {
    sent_messages: Arc<RwLock<HashMap<String, Vec<String>>>>,
    connected_clients: Arc<RwLock<Vec<String>>>,
}

impl MockConnectionManager {
    pub fn new() -> Self {
        Self {
            sent_messages: Arc::new(RwLock::new(HashMap::new())),
            connected_clients: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn add_connected_client(&self, client_id: &str) {
        self.connected_clients
            .write()
            .await
            .push(client_id.to_string());
    }

    pub async fn get_messages_for(&self, client_id: &str) -> Vec<String> {
        self.sent_messages
            .read()
            .await
            .get(client_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Pop the oldest unread message for a client
    pub async fn consume_message_for(&self, client_id: &str) -> Option<String> {
        let mut messages = self.sent_messages.write().await;
        let queue = messages.get_mut(client_id)?;
        if queue.is_empty() {
            None
        } else {
            Some(queue.remove(0))
        }
    }

    pub async fn clear_messages(&self) {
        self.sent_messages.write().await.clear();
    }
}

#[async_trait]
impl ConnectionManager for MockConnectionManager {
    async fn add_connection(&self, client_id: String, _sender: mpsc::UnboundedSender<String>) {
        self.add_connected_client(&client_id).await;
    }

    async fn remove_connection(&self, client_id: &str) {
        self.connected_clients
            .write()
            .await
            .retain(|c| c != client_id);
    }

    async fn send_to_client(&self, client_id: &str, message: &str) {
        self.sent_messages
            .write()
            .await
            .entry(client_id.to_string())
            .or_default()
            .push(message.to_string());
    }

    async fn send_to_clients(&self, client_ids: &[String], message: &str) {
        for client_id in client_ids {
            self.send_to_client(client_id, message).await;
        }
    }
}
