use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{bus::EventBus, handler::MatchEventHandler};

/// Manages match event subscriptions and routes events to handlers
pub struct MatchSubscription {
    match_id: String,
    handler: Arc<dyn MatchEventHandler>,
    event_bus: EventBus,
}

impl MatchSubscription {
    pub fn new(match_id: String, handler: Arc<dyn MatchEventHandler>, event_bus: EventBus) -> Self {
        Self {
            match_id,
            handler,
            event_bus,
        }
    }

    /// Start the subscription - spawns a background task that listens to
    /// match events and routes them to the handler
    pub async fn start(self) -> JoinHandle<()> {
        let match_id = self.match_id.clone();
        let handler_name = self.handler.handler_name();

        info!(
            match_id = %match_id,
            handler = handler_name,
            "Starting match subscription"
        );

        let mut receiver = self.event_bus.subscribe_to_match(&match_id).await;

        tokio::spawn(async move {
            info!(
                match_id = %match_id,
                handler = handler_name,
                "Match subscription task started"
            );

            while let Ok(event) = receiver.recv().await {
                if let Err(e) = self.handler.handle_match_event(&match_id, event).await {
                    warn!(
                        match_id = %match_id,
                        handler = handler_name,
                        error = %e,
                        "Match event handler failed"
                    );
                }
            }

            warn!(
                match_id = %match_id,
                handler = handler_name,
                "Match subscription ended - no more events"
            );
        })
    }
}
