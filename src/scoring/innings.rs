use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::EnumIter;

use super::ball::BallRecord;

/// Which innings of the match is being scored
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
pub enum InningsSelector {
    First,
    Second,
    SuperOver,
}

impl InningsSelector {
    pub fn index(&self) -> usize {
        match self {
            InningsSelector::First => 0,
            InningsSelector::Second => 1,
            InningsSelector::SuperOver => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(InningsSelector::First),
            1 => Some(InningsSelector::Second),
            2 => Some(InningsSelector::SuperOver),
            _ => None,
        }
    }
}

impl fmt::Display for InningsSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                InningsSelector::First => "first",
                InningsSelector::Second => "second",
                InningsSelector::SuperOver => "super-over",
            }
        )
    }
}

impl TryFrom<&str> for InningsSelector {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "first" => Ok(InningsSelector::First),
            "second" => Ok(InningsSelector::Second),
            "super-over" => Ok(InningsSelector::SuperOver),
            _ => Err(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InningsStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl fmt::Display for InningsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                InningsStatus::NotStarted => "not-started",
                InningsStatus::InProgress => "in-progress",
                InningsStatus::Completed => "completed",
            }
        )
    }
}

impl TryFrom<&str> for InningsStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "not-started" => Ok(InningsStatus::NotStarted),
            "in-progress" => Ok(InningsStatus::InProgress),
            "completed" => Ok(InningsStatus::Completed),
            other => Err(other.to_string()),
        }
    }
}

/// Extras buckets; each flagged delivery contributes its full run total
/// to its bucket (a wide with four overthrows adds five to wides)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extras {
    pub wides: u32,
    pub no_balls: u32,
    pub byes: u32,
    pub leg_byes: u32,
}

impl Extras {
    pub fn total(&self) -> u32 {
        self.wides + self.no_balls + self.byes + self.leg_byes
    }
}

/// Running totals for one innings, derived entirely from its ball log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InningsTotals {
    pub total_runs: u32,
    pub total_wickets: u32,
    /// Legal deliveries bowled
    pub total_balls: u32,
    /// Position of the NEXT legal delivery
    pub current_over: u32,
    /// 1-based; rolls to 1 of the next over after the sixth legal ball
    pub current_ball: u32,
    pub extras: Extras,
    pub fours: u32,
    pub sixes: u32,
}

impl InningsTotals {
    /// (over, ball_in_over) slot the next delivery will be bowled at
    pub fn position(&self) -> (u32, u32) {
        (self.current_over, self.current_ball)
    }
}

impl Default for InningsTotals {
    fn default() -> Self {
        accumulate(&[])
    }
}

/// Fold an ordered ball log into totals. Deterministic: the same log
/// always produces the same totals, so caches can be recomputed freely.
pub fn accumulate(balls: &[BallRecord]) -> InningsTotals {
    let mut totals = InningsTotals {
        total_runs: 0,
        total_wickets: 0,
        total_balls: 0,
        current_over: 0,
        current_ball: 1,
        extras: Extras::default(),
        fours: 0,
        sixes: 0,
    };

    for ball in balls {
        totals.total_runs += ball.runs;
        if ball.is_wicket {
            totals.total_wickets += 1;
        }
        if ball.is_legal() {
            totals.total_balls += 1;
        }
        if ball.is_wide {
            totals.extras.wides += ball.runs;
        }
        if ball.is_no_ball {
            totals.extras.no_balls += ball.runs;
        }
        if ball.is_bye {
            totals.extras.byes += ball.runs;
        }
        if ball.is_leg_bye {
            totals.extras.leg_byes += ball.runs;
        }
        if ball.is_four {
            totals.fours += 1;
        }
        if ball.is_six {
            totals.sixes += 1;
        }
    }

    totals.current_over = totals.total_balls / 6;
    totals.current_ball = totals.total_balls % 6 + 1;
    totals
}

/// One innings being scored.
///
/// The log may hold balls beyond `live` after an undo; only `balls[..live]`
/// is real. The tail is kept so redo can re-expose it and is discarded the
/// moment a new ball is recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Innings {
    pub team_id: String,
    pub status: InningsStatus,
    balls: Vec<BallRecord>,
    live: usize,
    totals: InningsTotals,
}

impl Innings {
    pub fn new(team_id: String) -> Self {
        Self {
            team_id,
            status: InningsStatus::NotStarted,
            balls: Vec::new(),
            live: 0,
            totals: InningsTotals::default(),
        }
    }

    pub fn live_balls(&self) -> &[BallRecord] {
        &self.balls[..self.live]
    }

    pub fn live_len(&self) -> usize {
        self.live
    }

    pub fn ball_at(&self, index: usize) -> Option<&BallRecord> {
        self.balls.get(index)
    }

    pub fn totals(&self) -> &InningsTotals {
        &self.totals
    }

    /// Append an accepted ball. Any undone tail is discarded first.
    pub fn record(&mut self, ball: BallRecord) {
        self.balls.truncate(self.live);
        self.balls.push(ball);
        self.live = self.balls.len();
        self.totals = accumulate(&self.balls[..self.live]);
        if self.status == InningsStatus::NotStarted {
            self.status = InningsStatus::InProgress;
        }
    }

    /// Drop any balls past the live prefix (a new ball in a sibling
    /// innings also invalidates this innings' redo tail)
    pub fn discard_redo_tail(&mut self) {
        self.balls.truncate(self.live);
    }

    /// Move the live cursor (undo/redo) and recompute totals
    pub fn set_live(&mut self, live: usize) {
        self.live = live.min(self.balls.len());
        self.totals = accumulate(&self.balls[..self.live]);
        if self.live == 0 {
            self.status = InningsStatus::NotStarted;
        } else if self.status == InningsStatus::NotStarted {
            self.status = InningsStatus::InProgress;
        }
    }

    /// Wipe the innings back to an unstarted state
    pub fn clear(&mut self) {
        self.balls.clear();
        self.live = 0;
        self.totals = InningsTotals::default();
        self.status = InningsStatus::NotStarted;
    }
}
