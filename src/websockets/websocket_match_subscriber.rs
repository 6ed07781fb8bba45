use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::{
    event::{EventBus, MatchEvent, MatchEventError, MatchEventHandler, MatchSubscription},
    websockets::connection_manager::ConnectionManager,
    websockets::messages::WebSocketMessage,
};

/// Routes match events from the bus to WebSocket connections
///
/// Membership is keyed on the `ClientJoined` event, not on the join
/// request: the client is added to the fan-out list and then sent its
/// snapshot, so every event after its join in bus order reaches it after
/// the snapshot, and nothing the snapshot already contains is re-sent.
pub struct WebSocketMatchSubscriber {
    connection_manager: Arc<dyn ConnectionManager + Send + Sync>,
    event_bus: EventBus,
    /// match_id -> client_ids currently receiving that match's broadcasts
    members: RwLock<HashMap<String, HashSet<String>>>,
    /// Matches with a running bus-subscription task
    subscribed: Mutex<HashSet<String>>,
}

impl WebSocketMatchSubscriber {
    pub fn new(
        connection_manager: Arc<dyn ConnectionManager + Send + Sync>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            connection_manager,
            event_bus,
            members: RwLock::new(HashMap::new()),
            subscribed: Mutex::new(HashSet::new()),
        }
    }

    /// Start a listener task for the match if one is not already running.
    ///
    /// Must complete before the join command is sent to the room, so the
    /// resulting `ClientJoined` event is observed.
    pub async fn ensure_subscribed(self: &Arc<Self>, match_id: &str) {
        let mut subscribed = self.subscribed.lock().await;
        if subscribed.contains(match_id) {
            return;
        }

        let handler: Arc<dyn MatchEventHandler> = self.clone();
        MatchSubscription::new(match_id.to_string(), handler, self.event_bus.clone())
            .start()
            .await;
        subscribed.insert(match_id.to_string());
        info!(match_id = %match_id, "WebSocket subscriber listening to match");
    }

    async fn members_of(&self, match_id: &str) -> Vec<String> {
        self.members
            .read()
            .await
            .get(match_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn broadcast(&self, match_id: &str, message: &WebSocketMessage) {
        let members = self.members_of(match_id).await;
        if members.is_empty() {
            return;
        }
        if let Ok(json) = serde_json::to_string(message) {
            self.connection_manager
                .send_to_clients(&members, &json)
                .await;
        }
    }

    async fn send_to(&self, client_id: &str, message: &WebSocketMessage) {
        if let Ok(json) = serde_json::to_string(message) {
            self.connection_manager.send_to_client(client_id, &json).await;
        }
    }
}

#[async_trait]
impl MatchEventHandler for WebSocketMatchSubscriber {
    async fn handle_match_event(
        &self,
        match_id: &str,
        event: MatchEvent,
    ) -> Result<(), MatchEventError> {
        debug!(
            match_id = %match_id,
            event = event.event_type(),
            "Routing match event to WebSocket connections"
        );

        match event {
            MatchEvent::BallAdded {
                match_id,
                innings,
                ball,
                totals,
            } => {
                let message = WebSocketMessage::ball_added(match_id.clone(), innings, ball, totals);
                self.broadcast(&match_id, &message).await;
            }
            MatchEvent::BallRemoved {
                match_id,
                innings,
                ball_id,
                totals,
            } => {
                let message =
                    WebSocketMessage::ball_removed(match_id.clone(), innings, ball_id, totals);
                self.broadcast(&match_id, &message).await;
            }
            MatchEvent::StateUpdated { match_id, state } => {
                let message = WebSocketMessage::match_state_updated(state);
                self.broadcast(&match_id, &message).await;
            }
            MatchEvent::ClientJoined {
                match_id,
                client_id,
                name,
                role,
                state,
            } => {
                // Announce to the existing audience first, then admit the
                // newcomer and hand it the snapshot
                let announce = WebSocketMessage::scorer_joined(client_id.clone(), name, role);
                self.broadcast(&match_id, &announce).await;

                self.members
                    .write()
                    .await
                    .entry(match_id.clone())
                    .or_default()
                    .insert(client_id.clone());
                self.send_to(&client_id, &WebSocketMessage::match_state(state))
                    .await;
            }
            MatchEvent::ClientLeft {
                match_id,
                client_id,
                name,
                role,
            } => {
                if let Some(set) = self.members.write().await.get_mut(&match_id) {
                    set.remove(&client_id);
                }
                let message = WebSocketMessage::scorer_left(client_id, name, role);
                self.broadcast(&match_id, &message).await;
            }
        }

        Ok(())
    }

    fn handler_name(&self) -> &'static str {
        "WebSocketMatchSubscriber"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::ClientRole;
    use crate::scoring::{BallCall, BallInput, InningsSelector, MatchConfig, MatchScoringSession};
    use crate::websockets::messages::MessageType;
    use crate::websockets::InMemoryConnectionManager;
    use tokio::sync::mpsc;

    fn session_with_one_ball() -> MatchScoringSession {
        let mut session = MatchScoringSession::new(MatchConfig {
            match_id: "m1".to_string(),
            team_a: "Kingston CC".to_string(),
            team_b: "Harbour XI".to_string(),
            total_overs: 20,
        });
        session
            .add_ball(InningsSelector::First, &BallCall::new(BallInput::Four))
            .unwrap();
        session
    }

    fn joined_event(session: &MatchScoringSession, client_id: &str) -> MatchEvent {
        MatchEvent::ClientJoined {
            match_id: "m1".to_string(),
            client_id: client_id.to_string(),
            name: "Asha".to_string(),
            role: ClientRole::Viewer,
            state: session.state(),
        }
    }

    async fn connect(
        manager: &InMemoryConnectionManager,
        client_id: &str,
    ) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        manager.add_connection(client_id.to_string(), tx).await;
        rx
    }

    fn parse(raw: String) -> WebSocketMessage {
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_join_delivers_snapshot_before_later_balls() {
        let manager = Arc::new(InMemoryConnectionManager::new());
        let subscriber = WebSocketMatchSubscriber::new(manager.clone(), EventBus::new());
        let mut rx = connect(&manager, "c1").await;

        let mut session = session_with_one_ball();
        subscriber
            .handle_match_event("m1", joined_event(&session, "c1"))
            .await
            .unwrap();

        let diff = session
            .add_ball(InningsSelector::First, &BallCall::new(BallInput::Six))
            .unwrap();
        subscriber
            .handle_match_event(
                "m1",
                MatchEvent::BallAdded {
                    match_id: "m1".to_string(),
                    innings: diff.innings,
                    ball: diff.ball,
                    totals: diff.totals,
                },
            )
            .await
            .unwrap();

        let snapshot = parse(rx.recv().await.unwrap());
        assert!(matches!(snapshot.message_type, MessageType::MatchState));
        // The snapshot carries the four already scored, but not the six
        let state: crate::scoring::MatchState =
            serde_json::from_value(snapshot.payload.get("state").unwrap().clone()).unwrap();
        assert_eq!(state.innings[0].totals.total_runs, 4);

        let added = parse(rx.recv().await.unwrap());
        assert!(matches!(added.message_type, MessageType::BallAdded));
    }

    #[tokio::test]
    async fn test_existing_members_hear_about_a_joiner() {
        let manager = Arc::new(InMemoryConnectionManager::new());
        let subscriber = WebSocketMatchSubscriber::new(manager.clone(), EventBus::new());
        let mut first_rx = connect(&manager, "c1").await;
        let mut second_rx = connect(&manager, "c2").await;

        let session = session_with_one_ball();
        subscriber
            .handle_match_event("m1", joined_event(&session, "c1"))
            .await
            .unwrap();
        let _snapshot = first_rx.recv().await.unwrap();

        subscriber
            .handle_match_event("m1", joined_event(&session, "c2"))
            .await
            .unwrap();

        let announce = parse(first_rx.recv().await.unwrap());
        assert!(matches!(announce.message_type, MessageType::ScorerJoined));
        // The joiner gets its snapshot, not its own announcement
        let snapshot = parse(second_rx.recv().await.unwrap());
        assert!(matches!(snapshot.message_type, MessageType::MatchState));
    }

    #[tokio::test]
    async fn test_departed_clients_stop_receiving() {
        let manager = Arc::new(InMemoryConnectionManager::new());
        let subscriber = WebSocketMatchSubscriber::new(manager.clone(), EventBus::new());
        let mut rx = connect(&manager, "c1").await;

        let mut session = session_with_one_ball();
        subscriber
            .handle_match_event("m1", joined_event(&session, "c1"))
            .await
            .unwrap();
        let _snapshot = rx.recv().await.unwrap();

        subscriber
            .handle_match_event(
                "m1",
                MatchEvent::ClientLeft {
                    match_id: "m1".to_string(),
                    client_id: "c1".to_string(),
                    name: "Asha".to_string(),
                    role: ClientRole::Viewer,
                },
            )
            .await
            .unwrap();

        let diff = session
            .add_ball(InningsSelector::First, &BallCall::new(BallInput::One))
            .unwrap();
        subscriber
            .handle_match_event(
                "m1",
                MatchEvent::BallAdded {
                    match_id: "m1".to_string(),
                    innings: diff.innings,
                    ball: diff.ball,
                    totals: diff.totals,
                },
            )
            .await
            .unwrap();

        assert!(rx.try_recv().is_err());
    }
}
