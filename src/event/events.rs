use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::room::ClientRole;
use crate::scoring::{BallRecord, InningsSelector, InningsTotals, MatchState};

/// Events that can occur during a scored match
///
/// Events represent facts about things that have already happened.
/// They are used to communicate state changes between different parts
/// of the system without tight coupling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MatchEvent {
    /// A delivery was recorded into the match log
    BallAdded {
        match_id: String,
        innings: InningsSelector,
        ball: BallRecord,
        totals: InningsTotals,
    },

    /// A delivery was removed from the tip of the match log (undo)
    BallRemoved {
        match_id: String,
        innings: InningsSelector,
        ball_id: Uuid,
        totals: InningsTotals,
    },

    /// The match state changed in a way that individual ball deltas
    /// cannot express (reset, innings completion, revised target)
    StateUpdated {
        match_id: String,
        state: MatchState,
    },

    /// A scorer or viewer joined the match room
    ClientJoined {
        match_id: String,
        client_id: String,
        name: String,
        role: ClientRole,
        state: MatchState,
    },

    /// A scorer or viewer left the match room
    ClientLeft {
        match_id: String,
        client_id: String,
        name: String,
        role: ClientRole,
    },
}

impl MatchEvent {
    /// Get the match_id associated with this event
    /// All events are match-specific
    pub fn match_id(&self) -> &str {
        match self {
            MatchEvent::BallAdded { match_id, .. } => match_id,
            MatchEvent::BallRemoved { match_id, .. } => match_id,
            MatchEvent::StateUpdated { match_id, .. } => match_id,
            MatchEvent::ClientJoined { match_id, .. } => match_id,
            MatchEvent::ClientLeft { match_id, .. } => match_id,
        }
    }

    /// Get a human-readable description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            MatchEvent::BallAdded { .. } => "ball_added",
            MatchEvent::BallRemoved { .. } => "ball_removed",
            MatchEvent::StateUpdated { .. } => "state_updated",
            MatchEvent::ClientJoined { .. } => "client_joined",
            MatchEvent::ClientLeft { .. } => "client_left",
        }
    }
}
