use serde_json;
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use scorebox::{
    scoring::MatchState,
    websockets::{MessageHandler, MessageType, WebSocketMessage},
};

use super::setup::TestSetup;

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    /// Send a WebSocket message and wait for processing
    pub async fn send_message(&self, client_id: &str, message: WebSocketMessage) {
        let message_json = serde_json::to_string(&message).unwrap();
        self.handlers
            .get(client_id)
            .unwrap_or_else(|| panic!("no handler for {client_id}"))
            .handle_message(client_id, message_json)
            .await;
        sleep(Duration::from_millis(10)).await;
    }

    /// Clear all recorded messages
    pub async fn clear_messages(&self) {
        self.mock_conn_manager.clear_messages().await;
    }

    /// Let the room's persistence and feed workers drain their queues
    pub async fn settle(&self) {
        sleep(Duration::from_millis(50)).await;
    }

    /// Current full state straight from the room, bypassing the wire
    pub async fn live_state(&self) -> MatchState {
        self.room().await.state().await.unwrap()
    }

    // ============================================================================
    // Convenience Action Methods
    // ============================================================================

    /// Join the test match
    pub async fn send_join(&self, client_id: &str) {
        self.send_message(
            client_id,
            WebSocketMessage::new(
                MessageType::JoinMatch,
                serde_json::json!({ "match_id": self.match_id }),
            ),
        )
        .await;
    }

    /// Leave the test match
    pub async fn send_leave(&self, client_id: &str) {
        self.send_message(
            client_id,
            WebSocketMessage::new(
                MessageType::LeaveMatch,
                serde_json::json!({ "match_id": self.match_id }),
            ),
        )
        .await;
    }

    /// Record a delivery in the first innings with a raw scorer token
    pub async fn send_ball(&self, client_id: &str, input: &str) {
        self.send_ball_to(client_id, "first", input).await;
    }

    /// Record a delivery in a chosen innings
    pub async fn send_ball_to(&self, client_id: &str, innings: &str, input: &str) {
        self.send_message(
            client_id,
            WebSocketMessage::new(
                MessageType::BallAdded,
                serde_json::json!({
                    "match_id": self.match_id,
                    "innings": innings,
                    "input": input
                }),
            ),
        )
        .await;
    }

    /// Undo a specific ball by id
    pub async fn send_undo(&self, client_id: &str, ball_id: Uuid) {
        self.send_message(
            client_id,
            WebSocketMessage::new(
                MessageType::BallUndo,
                serde_json::json!({ "match_id": self.match_id, "ball_id": ball_id }),
            ),
        )
        .await;
    }

    /// Redo the most recently undone ball
    pub async fn send_redo(&self, client_id: &str) {
        self.send_message(
            client_id,
            WebSocketMessage::new(
                MessageType::BallRedo,
                serde_json::json!({ "match_id": self.match_id }),
            ),
        )
        .await;
    }

    /// Mark an innings completed so scoring can move on
    pub async fn send_select_innings(&self, client_id: &str, innings: &str) {
        self.send_message(
            client_id,
            WebSocketMessage::new(
                MessageType::SelectInnings,
                serde_json::json!({ "match_id": self.match_id, "innings": innings }),
            ),
        )
        .await;
    }

    /// The id of the ball the next undo would remove
    pub async fn latest_ball_id(&self, innings_index: usize) -> Uuid {
        let state = self.live_state().await;
        state.innings[innings_index]
            .balls
            .last()
            .expect("innings should have a ball")
            .ball_id
    }
}
