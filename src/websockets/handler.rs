use async_trait::async_trait;
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::room::{ClientRole, MatchRoomHandle, RoomError};
use crate::scoring::{BallCall, BallInput, ScoringError, WicketKind};
use crate::shared::{AppError, AppState};
use crate::websockets::messages::{
    BallInputPayload, BallRedoPayload, BallUndoPayload, JoinMatchPayload, LeaveMatchPayload,
    MessageType, SelectInningsPayload, WebSocketMessage,
};

use super::socket::{Connection, MessageHandler};

/// Message handler for receiving WebSocket messages from one client
///
/// Validation happens here, before anything reaches a room's command
/// queue: unknown tokens, missing matches and role violations are
/// answered with an `error` frame on the offending connection only.
pub struct WebsocketReceiveHandler {
    app_state: AppState,
    name: String,
    role: ClientRole,
    /// Matches this connection has joined, for disconnect cleanup
    joined: Mutex<HashSet<String>>,
}

impl WebsocketReceiveHandler {
    pub fn new(app_state: AppState, name: String, role: ClientRole) -> Self {
        Self {
            app_state,
            name,
            role,
            joined: Mutex::new(HashSet::new()),
        }
    }

    async fn send_error(&self, client_id: &str, code: &str, message: String) {
        let frame = WebSocketMessage::error(code, message);
        if let Ok(json) = serde_json::to_string(&frame) {
            self.app_state
                .connection_manager
                .send_to_client(client_id, &json)
                .await;
        }
    }

    /// Resolve a room or report the failure to the client
    async fn room_or_error(&self, client_id: &str, match_id: &str) -> Option<MatchRoomHandle> {
        match self.app_state.registry.get(match_id).await {
            Some(handle) => Some(handle),
            None => {
                self.send_error(
                    client_id,
                    "match-not-found",
                    format!("No live match with id {match_id}"),
                )
                .await;
                None
            }
        }
    }

    /// Scoring commands are refused for viewers before they reach the room
    async fn require_scorer(&self, client_id: &str) -> bool {
        if self.role.can_score() {
            return true;
        }
        self.send_error(
            client_id,
            "not-a-scorer",
            "Viewers cannot record or undo deliveries".to_string(),
        )
        .await;
        false
    }

    async fn handle_join(&self, client_id: &str, payload: JoinMatchPayload) {
        let Some(room) = self.room_or_error(client_id, &payload.match_id).await else {
            return;
        };

        // The subscriber must be listening before the join command is
        // queued, or the snapshot event would go unobserved
        self.app_state
            .ws_subscriber
            .ensure_subscribed(&payload.match_id)
            .await;

        if room
            .join(client_id.to_string(), self.name.clone(), self.role)
            .await
            .is_err()
        {
            self.send_error(
                client_id,
                "match-closed",
                format!("Match {} is no longer live", payload.match_id),
            )
            .await;
            return;
        }
        self.joined.lock().await.insert(payload.match_id);
    }

    async fn handle_leave(&self, client_id: &str, payload: LeaveMatchPayload) {
        if !self.joined.lock().await.remove(&payload.match_id) {
            return;
        }
        if let Some(room) = self.app_state.registry.get(&payload.match_id).await {
            let _ = room
                .leave(client_id.to_string(), self.name.clone(), self.role)
                .await;
        }
    }

    async fn handle_ball_added(&self, client_id: &str, payload: BallInputPayload) {
        if !self.require_scorer(client_id).await {
            return;
        }
        let Some(room) = self.room_or_error(client_id, &payload.match_id).await else {
            return;
        };

        let input = match BallInput::try_from(payload.input.as_str()) {
            Ok(input) => input,
            Err(token) => {
                self.send_error(
                    client_id,
                    "bad-input",
                    format!("Unrecognized ball input: {token}"),
                )
                .await;
                return;
            }
        };
        let wicket = match payload.wicket.as_deref().map(WicketKind::try_from) {
            None => None,
            Some(Ok(kind)) => Some(kind),
            Some(Err(token)) => {
                self.send_error(
                    client_id,
                    "bad-input",
                    format!("Unrecognized wicket kind: {token}"),
                )
                .await;
                return;
            }
        };

        let mut call = BallCall::new(input);
        call.runs = payload.runs;
        call.wicket = wicket;
        call.batsman_id = payload.batsman_id;
        call.bowler_id = payload.bowler_id;

        if let Err(e) = room.add_ball(payload.innings, call).await {
            self.send_error(client_id, "scoring-rejected", e.to_string())
                .await;
        }
    }

    async fn handle_ball_undo(&self, client_id: &str, payload: BallUndoPayload) {
        if !self.require_scorer(client_id).await {
            return;
        }
        let Some(room) = self.room_or_error(client_id, &payload.match_id).await else {
            return;
        };
        match room.undo(Some(payload.ball_id)).await {
            Ok(_) => {}
            // Undo at the oldest snapshot is a benign no-op, not a failure
            Err(RoomError::Scoring(ScoringError::NothingToUndo)) => {
                debug!(client_id = %client_id, "Undo at baseline ignored");
            }
            Err(e) => {
                self.send_error(client_id, "undo-rejected", e.to_string())
                    .await;
            }
        }
    }

    async fn handle_ball_redo(&self, client_id: &str, payload: BallRedoPayload) {
        if !self.require_scorer(client_id).await {
            return;
        }
        let Some(room) = self.room_or_error(client_id, &payload.match_id).await else {
            return;
        };
        match room.redo().await {
            Ok(_) => {}
            // Nothing undone to re-apply; stay quiet like undo-at-baseline
            Err(RoomError::Scoring(ScoringError::NothingToRedo)) => {
                debug!(client_id = %client_id, "Redo at tip ignored");
            }
            Err(e) => {
                self.send_error(client_id, "redo-rejected", e.to_string())
                    .await;
            }
        }
    }

    async fn handle_select_innings(&self, client_id: &str, payload: SelectInningsPayload) {
        if !self.require_scorer(client_id).await {
            return;
        }
        let Some(room) = self.room_or_error(client_id, &payload.match_id).await else {
            return;
        };
        if let Err(e) = room.complete_innings(payload.innings).await {
            self.send_error(client_id, "innings-rejected", e.to_string())
                .await;
        }
    }

    /// Leave every joined match; called when the connection drops
    pub async fn leave_all(&self, client_id: &str) {
        let joined: Vec<String> = self.joined.lock().await.drain().collect();
        for match_id in joined {
            if let Some(room) = self.app_state.registry.get(&match_id).await {
                let _ = room
                    .leave(client_id.to_string(), self.name.clone(), self.role)
                    .await;
            }
        }
    }
}

#[async_trait]
impl MessageHandler for WebsocketReceiveHandler {
    async fn handle_message(&self, client_id: &str, message: String) {
        debug!(
            client_id = %client_id,
            message = %message,
            "Received message"
        );

        let ws_message = match serde_json::from_str::<WebSocketMessage>(&message) {
            Ok(m) => m,
            Err(e) => {
                warn!(client_id = %client_id, error = %e, "Failed to parse WebSocket message");
                self.send_error(client_id, "bad-message", format!("Unparseable frame: {e}"))
                    .await;
                return;
            }
        };

        macro_rules! with_payload {
            ($ty:ty, $handler:ident) => {
                match serde_json::from_value::<$ty>(ws_message.payload) {
                    Ok(payload) => self.$handler(client_id, payload).await,
                    Err(e) => {
                        self.send_error(client_id, "bad-message", format!("Bad payload: {e}"))
                            .await
                    }
                }
            };
        }

        match ws_message.message_type {
            MessageType::JoinMatch => with_payload!(JoinMatchPayload, handle_join),
            MessageType::LeaveMatch => with_payload!(LeaveMatchPayload, handle_leave),
            MessageType::BallAdded => with_payload!(BallInputPayload, handle_ball_added),
            MessageType::BallUndo => with_payload!(BallUndoPayload, handle_ball_undo),
            MessageType::BallRedo => with_payload!(BallRedoPayload, handle_ball_redo),
            MessageType::SelectInnings => {
                with_payload!(SelectInningsPayload, handle_select_innings)
            }
            other => {
                debug!(message_type = ?other, "Server-to-client message type from a client");
                self.send_error(
                    client_id,
                    "bad-message",
                    "Message type is server-to-client only".to_string(),
                )
                .await;
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Stable client identity; generated when absent
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// "scorer" or "viewer"; defaults to viewer
    #[serde(default)]
    pub role: Option<String>,
}

/// WebSocket endpoint
/// GET /ws?client_id=&name=&role=
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(app_state): State<AppState>,
) -> Result<Response, AppError> {
    let role = ClientRole::try_from(query.role.as_deref().unwrap_or("viewer"))
        .map_err(|token| AppError::BadRequest(format!("Unknown role: {token}")))?;
    let client_id = match query.client_id {
        Some(id) if !id.trim().is_empty() => id,
        _ => Uuid::new_v4().to_string(),
    };
    let name = query.name.unwrap_or_else(|| client_id.clone());

    info!(
        client_id = %client_id,
        name = %name,
        role = %role,
        "WebSocket connection requested"
    );

    Ok(ws.on_upgrade(move |socket| {
        handle_websocket_connection(socket, client_id, name, role, app_state)
    }))
}

/// Handle the upgraded WebSocket connection
async fn handle_websocket_connection(
    socket: axum::extract::ws::WebSocket,
    client_id: String,
    name: String,
    role: ClientRole,
    app_state: AppState,
) {
    info!(
        client_id = %client_id,
        role = %role,
        "WebSocket connection established"
    );

    // Create the outbound channel (app -> client)
    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();

    app_state
        .connection_manager
        .add_connection(client_id.clone(), outbound_sender)
        .await;

    let message_handler = Arc::new(WebsocketReceiveHandler::new(app_state.clone(), name, role));

    // Wrap the axum WebSocket in our simple interface
    let connection = Connection::new(
        client_id.clone(),
        Box::new(socket),
        outbound_receiver,
        message_handler.clone(),
    );

    // Run the connection until disconnect
    match connection.run().await {
        Ok(()) => {
            info!(client_id = %client_id, "WebSocket connection closed cleanly");
        }
        Err(e) => {
            warn!(client_id = %client_id, error = ?e, "WebSocket connection error");
        }
    }

    // Cleanup: a dropped scorer leaves every room it joined; any command
    // already accepted by a room has completed server-side
    message_handler.leave_all(&client_id).await;
    app_state
        .connection_manager
        .remove_connection(&client_id)
        .await;

    info!(client_id = %client_id, "WebSocket disconnect cleanup finished");
}
