use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::events::MatchEvent;

/// A broadcast channel holds a bounded backlog per subscriber; 256 covers
/// a burst of reconciled balls plus presence churn without lagging anyone.
const CHANNEL_CAPACITY: usize = 256;

/// Per-match broadcast channels keyed by match id. Channels come into
/// existence on first use, whether that use is an emit or a subscribe, so
/// neither side has to care which happened first.
#[derive(Debug, Clone)]
pub struct EventBus {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<MatchEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Deliver an event to every subscriber of one match
    pub async fn emit_to_match(&self, match_id: &str, event: MatchEvent) {
        let sender = self.sender_for(match_id).await;
        match sender.send(event) {
            Ok(receivers) => {
                debug!(match_id = %match_id, receivers, "Match event emitted");
            }
            Err(_) => {
                debug!(match_id = %match_id, "Match event emitted with no receivers");
            }
        }
    }

    /// Open a receiver on one match's event stream
    pub async fn subscribe_to_match(&self, match_id: &str) -> broadcast::Receiver<MatchEvent> {
        self.sender_for(match_id).await.subscribe()
    }

    /// Drop the channel for a retired match so late subscribers get a
    /// fresh, empty channel instead of a stale backlog
    pub async fn remove_match(&self, match_id: &str) {
        if self.channels.write().await.remove(match_id).is_some() {
            debug!(match_id = %match_id, "Match channel removed");
        }
    }

    async fn sender_for(&self, match_id: &str) -> broadcast::Sender<MatchEvent> {
        if let Some(sender) = self.channels.read().await.get(match_id) {
            return sender.clone();
        }

        let mut channels = self.channels.write().await;
        channels
            .entry(match_id.to_string())
            .or_insert_with(|| {
                debug!(match_id = %match_id, "Opening match channel");
                broadcast::channel(CHANNEL_CAPACITY).0
            })
            .clone()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
