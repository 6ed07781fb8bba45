use serde::{Deserialize, Serialize};

use crate::scoring::MatchConfig;
use crate::sync::QueuedBall;

/// What a connected client is allowed to do in a match room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientRole {
    Scorer,
    Viewer,
}

impl ClientRole {
    /// Only scorers may record, undo or redo deliveries
    pub fn can_score(&self) -> bool {
        matches!(self, ClientRole::Scorer)
    }
}

impl std::fmt::Display for ClientRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientRole::Scorer => write!(f, "scorer"),
            ClientRole::Viewer => write!(f, "viewer"),
        }
    }
}

impl TryFrom<&str> for ClientRole {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "scorer" => Ok(ClientRole::Scorer),
            "viewer" => Ok(ClientRole::Viewer),
            other => Err(other.to_string()),
        }
    }
}

/// Request payload for opening a new match room
#[derive(Debug, Deserialize)]
pub struct CreateMatchRequest {
    /// Caller-supplied identifier, e.g. a fixture code; generated when absent
    #[serde(default)]
    pub match_id: Option<String>,
    pub team_a: String,
    pub team_b: String,
    pub total_overs: u32,
}

/// Response for match creation and match listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSummary {
    pub match_id: String,
    pub team_a: String,
    pub team_b: String,
    pub total_overs: u32,
}

impl From<&MatchConfig> for MatchSummary {
    fn from(config: &MatchConfig) -> Self {
        Self {
            match_id: config.match_id.clone(),
            team_a: config.team_a.clone(),
            team_b: config.team_b.clone(),
            total_overs: config.total_overs,
        }
    }
}

/// Request payload for a rain-interruption target calculation
#[derive(Debug, Deserialize)]
pub struct DlsComputeRequest {
    pub overs_at_start: f64,
    pub overs_remaining: f64,
    pub wickets_lost: u32,
}

/// Request payload for replaying deliveries queued while offline
#[derive(Debug, Serialize, Deserialize)]
pub struct ReconcileRequest {
    /// The scorer whose queue this is, for the audit trail
    #[serde(default)]
    pub client_id: Option<String>,
    pub balls: Vec<QueuedBall>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_tokens_round_trip() {
        assert_eq!(
            serde_json::to_string(&ClientRole::Scorer).unwrap(),
            "\"scorer\""
        );
        assert_eq!(ClientRole::try_from("viewer").unwrap(), ClientRole::Viewer);
        assert!(ClientRole::try_from("umpire").is_err());
    }

    #[test]
    fn test_only_scorers_can_score() {
        assert!(ClientRole::Scorer.can_score());
        assert!(!ClientRole::Viewer.can_score());
    }

    #[test]
    fn test_create_request_match_id_is_optional() {
        let request: CreateMatchRequest =
            serde_json::from_str(r#"{"team_a": "A", "team_b": "B", "total_overs": 20}"#).unwrap();
        assert!(request.match_id.is_none());
        assert_eq!(request.total_overs, 20);
    }
}
