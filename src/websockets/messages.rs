use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::room::ClientRole;
use crate::scoring::{BallRecord, InningsSelector, InningsTotals, MatchState};

/// Message types for WebSocket communication
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    // Client -> Server
    JoinMatch,
    LeaveMatch,
    BallUndo,
    BallRedo,
    SelectInnings,

    // Both directions: a scorer submits `ball-added`, the room echoes the
    // accepted record back out under the same type
    BallAdded,

    // Server -> Client
    MatchState,
    BallRemoved,
    MatchStateUpdated,
    ScorerJoined,
    ScorerLeft,
    Error,
}

/// Metadata for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessageMeta {
    pub timestamp: DateTime<Utc>,
    pub scorer_id: Option<String>,
}

/// Base structure for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub payload: serde_json::Value,
    pub meta: Option<WebSocketMessageMeta>,
}

/// Client-to-Server message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinMatchPayload {
    pub match_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveMatchPayload {
    pub match_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallInputPayload {
    pub match_id: String,
    pub innings: InningsSelector,
    /// Raw scorer token: "0".."6", "W", "WD", "NB", "B", "LB"
    pub input: String,
    #[serde(default)]
    pub runs: Option<u32>,
    #[serde(default)]
    pub wicket: Option<String>,
    #[serde(default)]
    pub batsman_id: Option<String>,
    #[serde(default)]
    pub bowler_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallUndoPayload {
    pub match_id: String,
    /// The ball the scorer believes is latest; a stale id is refused
    pub ball_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallRedoPayload {
    pub match_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectInningsPayload {
    pub match_id: String,
    /// The innings being closed out before scoring moves on
    pub innings: InningsSelector,
}

/// Server-to-Client message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchStatePayload {
    pub state: MatchState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallBroadcastPayload {
    pub match_id: String,
    pub innings: InningsSelector,
    pub ball: BallRecord,
    pub totals: InningsTotals,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallRemovedPayload {
    pub match_id: String,
    pub innings: InningsSelector,
    pub ball_id: Uuid,
    pub totals: InningsTotals,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerPresencePayload {
    pub client_id: String,
    pub name: String,
    pub role: ClientRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

/// Helper functions for creating messages
impl WebSocketMessage {
    pub fn new(message_type: MessageType, payload: serde_json::Value) -> Self {
        Self {
            message_type,
            payload,
            meta: Some(WebSocketMessageMeta {
                timestamp: Utc::now(),
                scorer_id: None,
            }),
        }
    }

    /// Create a MATCH-STATE snapshot message (sent on join and after a
    /// reconciliation)
    pub fn match_state(state: MatchState) -> Self {
        let payload = MatchStatePayload { state };
        Self::new(
            MessageType::MatchState,
            serde_json::to_value(payload).unwrap(),
        )
    }

    /// Create a BALL-ADDED broadcast for an accepted (or redone) delivery
    pub fn ball_added(
        match_id: String,
        innings: InningsSelector,
        ball: BallRecord,
        totals: InningsTotals,
    ) -> Self {
        let payload = BallBroadcastPayload {
            match_id,
            innings,
            ball,
            totals,
        };
        Self::new(
            MessageType::BallAdded,
            serde_json::to_value(payload).unwrap(),
        )
    }

    /// Create a BALL-REMOVED broadcast for an undone delivery
    pub fn ball_removed(
        match_id: String,
        innings: InningsSelector,
        ball_id: Uuid,
        totals: InningsTotals,
    ) -> Self {
        let payload = BallRemovedPayload {
            match_id,
            innings,
            ball_id,
            totals,
        };
        Self::new(
            MessageType::BallRemoved,
            serde_json::to_value(payload).unwrap(),
        )
    }

    /// Create a MATCH-STATE-UPDATED message for resets, innings status
    /// changes and DLS revisions
    pub fn match_state_updated(state: MatchState) -> Self {
        let payload = MatchStatePayload { state };
        Self::new(
            MessageType::MatchStateUpdated,
            serde_json::to_value(payload).unwrap(),
        )
    }

    /// Create a SCORER-JOINED message
    pub fn scorer_joined(client_id: String, name: String, role: ClientRole) -> Self {
        let payload = ScorerPresencePayload {
            client_id,
            name,
            role,
        };
        Self::new(
            MessageType::ScorerJoined,
            serde_json::to_value(payload).unwrap(),
        )
    }

    /// Create a SCORER-LEFT message
    pub fn scorer_left(client_id: String, name: String, role: ClientRole) -> Self {
        let payload = ScorerPresencePayload {
            client_id,
            name,
            role,
        };
        Self::new(
            MessageType::ScorerLeft,
            serde_json::to_value(payload).unwrap(),
        )
    }

    /// Create an ERROR message, delivered only to the offending client
    pub fn error(code: &str, message: String) -> Self {
        let payload = ErrorPayload {
            code: code.to_string(),
            message,
        };
        Self::new(MessageType::Error, serde_json::to_value(payload).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{BallCall, BallInput, MatchConfig, MatchScoringSession};

    fn sample_state() -> MatchState {
        let mut session = MatchScoringSession::new(MatchConfig {
            match_id: "m1".to_string(),
            team_a: "Kingston CC".to_string(),
            team_b: "Harbour XI".to_string(),
            total_overs: 20,
        });
        session
            .add_ball(InningsSelector::First, &BallCall::new(BallInput::Four))
            .unwrap();
        session.state()
    }

    #[test]
    fn test_message_types_use_kebab_case_on_the_wire() {
        let m = WebSocketMessage::match_state(sample_state());
        let s = serde_json::to_string(&m).unwrap();
        assert!(s.contains("\"type\":\"match-state\""));

        let e = WebSocketMessage::error("bad-input", "unrecognized token".to_string());
        let s = serde_json::to_string(&e).unwrap();
        assert!(s.contains("\"type\":\"error\""));
        assert!(s.contains("\"code\":\"bad-input\""));
    }

    #[test]
    fn test_message_constructors_and_serialization() {
        let diff_state = sample_state();
        let ball = diff_state.innings[0].balls[0].clone();
        let totals = diff_state.innings[0].totals;

        let added = WebSocketMessage::ball_added(
            "m1".to_string(),
            InningsSelector::First,
            ball.clone(),
            totals,
        );
        assert!(matches!(added.message_type, MessageType::BallAdded));
        let s = serde_json::to_string(&added).unwrap();
        let back: WebSocketMessage = serde_json::from_str(&s).unwrap();
        assert!(matches!(back.message_type, MessageType::BallAdded));

        let removed = WebSocketMessage::ball_removed(
            "m1".to_string(),
            InningsSelector::First,
            ball.ball_id,
            totals,
        );
        assert!(matches!(removed.message_type, MessageType::BallRemoved));

        let updated = WebSocketMessage::match_state_updated(diff_state);
        assert!(matches!(
            updated.message_type,
            MessageType::MatchStateUpdated
        ));

        let joined = WebSocketMessage::scorer_joined(
            "c1".to_string(),
            "Asha".to_string(),
            ClientRole::Scorer,
        );
        assert!(matches!(joined.message_type, MessageType::ScorerJoined));

        let left = WebSocketMessage::scorer_left(
            "c1".to_string(),
            "Asha".to_string(),
            ClientRole::Viewer,
        );
        assert!(matches!(left.message_type, MessageType::ScorerLeft));
    }

    #[test]
    fn test_ball_input_payload_optional_fields_default() {
        let payload: BallInputPayload = serde_json::from_str(
            r#"{"match_id": "m1", "innings": "first", "input": "4"}"#,
        )
        .unwrap();
        assert_eq!(payload.input, "4");
        assert!(payload.runs.is_none());
        assert!(payload.wicket.is_none());

        let call = BallCall::new(BallInput::try_from(payload.input.as_str()).unwrap());
        assert_eq!(call.input, BallInput::Four);
    }
}
