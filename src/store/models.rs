use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scoring::{BallInput, BallRecord, InningsSelector, InningsStatus, InningsTotals, WicketKind};

/// One stored delivery
///
/// Rows are append-only. An undo marks the row voided instead of removing
/// it, and a redo clears the mark again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallRow {
    pub ball_id: Uuid,
    pub match_id: String,
    pub innings: InningsSelector,
    /// Zero-based position in the innings log at acceptance time
    pub seq: usize,
    pub input: BallInput,
    pub runs: u32,
    pub over: u32,
    pub ball_in_over: u32,
    pub is_wide: bool,
    pub is_no_ball: bool,
    pub is_bye: bool,
    pub is_leg_bye: bool,
    pub is_wicket: bool,
    pub wicket: Option<WicketKind>,
    pub batsman_id: Option<String>,
    pub bowler_id: Option<String>,
    pub voided: bool,
    pub recorded_at: DateTime<Utc>,
}

impl BallRow {
    pub fn from_record(
        match_id: &str,
        innings: InningsSelector,
        seq: usize,
        record: &BallRecord,
    ) -> Self {
        Self {
            ball_id: record.ball_id,
            match_id: match_id.to_string(),
            innings,
            seq,
            input: record.input,
            runs: record.runs,
            over: record.over,
            ball_in_over: record.ball_in_over,
            is_wide: record.is_wide,
            is_no_ball: record.is_no_ball,
            is_bye: record.is_bye,
            is_leg_bye: record.is_leg_bye,
            is_wicket: record.is_wicket,
            wicket: record.wicket,
            batsman_id: record.batsman_id.clone(),
            bowler_id: record.bowler_id.clone(),
            voided: false,
            recorded_at: record.recorded_at,
        }
    }
}

/// Scoreboard snapshot for one innings, overwritten after every change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InningsSnapshotRow {
    pub match_id: String,
    pub innings: InningsSelector,
    pub status: InningsStatus,
    pub total_runs: u32,
    pub total_wickets: u32,
    pub total_balls: u32,
    pub current_over: u32,
    pub current_ball: u32,
    pub wides: u32,
    pub no_balls: u32,
    pub byes: u32,
    pub leg_byes: u32,
    pub fours: u32,
    pub sixes: u32,
    pub updated_at: DateTime<Utc>,
}

impl InningsSnapshotRow {
    pub fn from_totals(
        match_id: &str,
        innings: InningsSelector,
        status: InningsStatus,
        totals: &InningsTotals,
    ) -> Self {
        Self {
            match_id: match_id.to_string(),
            innings,
            status,
            total_runs: totals.total_runs,
            total_wickets: totals.total_wickets,
            total_balls: totals.total_balls,
            current_over: totals.current_over,
            current_ball: totals.current_ball,
            wides: totals.extras.wides,
            no_balls: totals.extras.no_balls,
            byes: totals.extras.byes,
            leg_byes: totals.extras.leg_byes,
            fours: totals.fours,
            sixes: totals.sixes,
            updated_at: Utc::now(),
        }
    }
}
