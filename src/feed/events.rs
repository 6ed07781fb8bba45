use serde::{Deserialize, Serialize};

use crate::scoring::{BallRecord, InningsSelector, InningsTotals};

/// A single accepted delivery, shaped for external commentary surfaces
///
/// Feed events are emitted in delivery order per match. An undone ball is
/// not retracted from the feed; the corrected delivery simply follows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallFeedEvent {
    pub match_id: String,
    pub innings: InningsSelector,
    /// Position of the ball in the innings log at publish time
    pub seq: usize,
    pub batting_team: String,
    pub ball: BallRecord,
    pub totals: InningsTotals,
}

impl BallFeedEvent {
    /// One-line ticker text, e.g. "0.3 W | Kingston CC 12/1"
    pub fn headline(&self) -> String {
        format!(
            "{} | {} {}/{}",
            self.ball, self.batting_team, self.totals.total_runs, self.totals.total_wickets
        )
    }
}
