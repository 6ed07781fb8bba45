use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use uuid::Uuid;

use super::ball::{BallCall, BallRecord};
use super::dls::{self, DlsComputation};
use super::innings::{Innings, InningsSelector, InningsStatus, InningsTotals};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error("Nothing to redo")]
    NothingToRedo,
    #[error("Innings already completed: {0}")]
    InningsOver(InningsSelector),
    #[error("Innings not started: {0}")]
    UnknownInnings(InningsSelector),
    #[error("Ball {0} is not the latest ball")]
    NotLatestBall(Uuid),
    #[error("Sequence conflict at {over}.{ball}: {reason}")]
    SequenceConflict { over: u32, ball: u32, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    pub match_id: String,
    pub team_a: String,
    pub team_b: String,
    pub total_overs: u32,
}

/// The single-ball change produced by one scoring step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallDiff {
    pub innings: InningsSelector,
    /// Zero-based position of the ball in its innings log
    pub seq: usize,
    pub ball: BallRecord,
    pub totals: InningsTotals,
}

/// Full match snapshot for the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    pub config: MatchConfig,
    pub innings: Vec<InningsView>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub dls: Option<DlsComputation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InningsView {
    pub innings: InningsSelector,
    pub team_id: String,
    pub status: InningsStatus,
    pub totals: InningsTotals,
    pub balls: Vec<BallRecord>,
}

/// All scoring state for one live match.
///
/// History is a vector of the three innings' log lengths, one entry per
/// accepted ball plus the empty baseline at index 0. Undo and redo move a
/// cursor through it and restore the recorded lengths; the ball logs
/// themselves are never copied. Every step changes exactly one innings by
/// exactly one ball, so each cursor move identifies a single ball diff.
#[derive(Debug, Clone)]
pub struct MatchScoringSession {
    config: MatchConfig,
    innings: [Option<Innings>; 3],
    history: Vec<[usize; 3]>,
    cursor: usize,
    dls: Option<DlsComputation>,
}

impl MatchScoringSession {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            config,
            innings: [None, None, None],
            history: vec![[0, 0, 0]],
            cursor: 0,
            dls: None,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn innings(&self, selector: InningsSelector) -> Option<&Innings> {
        self.innings[selector.index()].as_ref()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.history.len()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Record a delivery. The innings is created on its first ball; adding
    /// after an undo discards the redo branch for good.
    pub fn add_ball(
        &mut self,
        selector: InningsSelector,
        call: &BallCall,
    ) -> Result<BallDiff, ScoringError> {
        let idx = selector.index();
        if matches!(&self.innings[idx], Some(i) if i.status == InningsStatus::Completed) {
            return Err(ScoringError::InningsOver(selector));
        }

        self.discard_redo_branch();

        let team_id = self.batting_team(selector);
        let innings = self.innings[idx].get_or_insert_with(|| Innings::new(team_id));

        let (over, ball_in_over) = innings.totals().position();
        let ball = call.classify(over, ball_in_over);
        innings.record(ball.clone());
        let totals = *innings.totals();
        let seq = innings.live_len() - 1;

        self.history.push(self.lens());
        self.cursor = self.history.len() - 1;

        Ok(BallDiff {
            innings: selector,
            seq,
            ball,
            totals,
        })
    }

    /// Add a ball that must land at an exact slot. Offline replay records
    /// both the sequence index and the over.ball position each queued ball
    /// was scored at; either mismatch means the logs have diverged.
    pub fn add_ball_at(
        &mut self,
        selector: InningsSelector,
        call: &BallCall,
        expected_seq: usize,
        expected_over: u32,
        expected_ball: u32,
    ) -> Result<BallDiff, ScoringError> {
        let (live, position) = match &self.innings[selector.index()] {
            Some(innings) => (innings.live_len(), innings.totals().position()),
            None => (0, (0, 1)),
        };
        if live != expected_seq {
            return Err(ScoringError::SequenceConflict {
                over: expected_over,
                ball: expected_ball,
                reason: format!("expected sequence {expected_seq}, innings has {live} balls"),
            });
        }
        if position != (expected_over, expected_ball) {
            return Err(ScoringError::SequenceConflict {
                over: expected_over,
                ball: expected_ball,
                reason: format!("innings is at {}.{}", position.0, position.1),
            });
        }
        self.add_ball(selector, call)
    }

    /// The ball the next undo would remove
    pub fn latest_ball(&self) -> Option<&BallRecord> {
        if self.cursor == 0 {
            return None;
        }
        let prev = self.history[self.cursor - 1];
        let cur = self.history[self.cursor];
        let idx = Self::changed_index(prev, cur)?;
        self.innings[idx].as_ref()?.ball_at(cur[idx] - 1)
    }

    /// Undo guarded by the id of the ball the caller believes is latest
    pub fn undo_ball(&mut self, ball_id: Uuid) -> Result<BallDiff, ScoringError> {
        match self.latest_ball() {
            Some(ball) if ball.ball_id == ball_id => self.undo(),
            Some(_) => Err(ScoringError::NotLatestBall(ball_id)),
            None => Err(ScoringError::NothingToUndo),
        }
    }

    pub fn undo(&mut self) -> Result<BallDiff, ScoringError> {
        if self.cursor == 0 {
            return Err(ScoringError::NothingToUndo);
        }
        let prev = self.history[self.cursor - 1];
        let cur = self.history[self.cursor];
        let idx = Self::changed_index(prev, cur).ok_or(ScoringError::NothingToUndo)?;
        let selector = InningsSelector::from_index(idx).ok_or(ScoringError::NothingToUndo)?;

        let innings = self.innings[idx]
            .as_mut()
            .ok_or(ScoringError::NothingToUndo)?;
        let ball = innings
            .ball_at(cur[idx] - 1)
            .cloned()
            .ok_or(ScoringError::NothingToUndo)?;
        innings.set_live(prev[idx]);
        let totals = *innings.totals();

        self.cursor -= 1;
        Ok(BallDiff {
            innings: selector,
            seq: prev[idx],
            ball,
            totals,
        })
    }

    pub fn redo(&mut self) -> Result<BallDiff, ScoringError> {
        if !self.can_redo() {
            return Err(ScoringError::NothingToRedo);
        }
        let cur = self.history[self.cursor];
        let next = self.history[self.cursor + 1];
        let idx = Self::changed_index(cur, next).ok_or(ScoringError::NothingToRedo)?;
        let selector = InningsSelector::from_index(idx).ok_or(ScoringError::NothingToRedo)?;

        let innings = self.innings[idx]
            .as_mut()
            .ok_or(ScoringError::NothingToRedo)?;
        let ball = innings
            .ball_at(next[idx] - 1)
            .cloned()
            .ok_or(ScoringError::NothingToRedo)?;
        innings.set_live(next[idx]);
        let totals = *innings.totals();

        self.cursor += 1;
        Ok(BallDiff {
            innings: selector,
            seq: next[idx] - 1,
            ball,
            totals,
        })
    }

    /// Wipe one innings and restart history from the current shape.
    /// Everything scored before the reset is no longer reachable by undo.
    pub fn reset_innings(&mut self, selector: InningsSelector) -> Result<(), ScoringError> {
        let idx = selector.index();
        let innings = self.innings[idx]
            .as_mut()
            .ok_or(ScoringError::UnknownInnings(selector))?;
        innings.clear();

        self.history = vec![self.lens()];
        self.cursor = 0;
        Ok(())
    }

    /// Only callers mark an innings completed; scoring never does. Match
    /// control may close an innings that never batted (forfeit,
    /// declaration), so the innings is created here when absent.
    pub fn complete_innings(&mut self, selector: InningsSelector) -> Result<(), ScoringError> {
        let team_id = self.batting_team(selector);
        let innings = self.innings[selector.index()].get_or_insert_with(|| Innings::new(team_id));
        innings.status = InningsStatus::Completed;
        Ok(())
    }

    /// Revised target against the live score, remembered on the match
    pub fn compute_dls(
        &mut self,
        overs_at_start: f64,
        overs_remaining: f64,
        wickets_lost: u32,
    ) -> DlsComputation {
        let first_innings_runs = self.innings[InningsSelector::First.index()]
            .as_ref()
            .map(|i| i.totals().total_runs)
            .unwrap_or(0);
        let chasing_runs = self.innings[InningsSelector::Second.index()]
            .as_ref()
            .map(|i| i.totals().total_runs)
            .unwrap_or(0);

        let computation = dls::compute(
            first_innings_runs + 1,
            overs_at_start,
            overs_remaining,
            wickets_lost,
            chasing_runs,
        );
        self.dls = Some(computation.clone());
        computation
    }

    pub fn dls(&self) -> Option<&DlsComputation> {
        self.dls.as_ref()
    }

    /// Full scoreboard snapshot. All three innings appear, batted or not,
    /// so a fresh match already shows its not-started innings.
    pub fn state(&self) -> MatchState {
        let mut views = Vec::new();
        for selector in InningsSelector::iter() {
            let view = match &self.innings[selector.index()] {
                Some(innings) => InningsView {
                    innings: selector,
                    team_id: innings.team_id.clone(),
                    status: innings.status,
                    totals: *innings.totals(),
                    balls: innings.live_balls().to_vec(),
                },
                None => InningsView {
                    innings: selector,
                    team_id: self.batting_team(selector),
                    status: InningsStatus::NotStarted,
                    totals: InningsTotals::default(),
                    balls: Vec::new(),
                },
            };
            views.push(view);
        }
        MatchState {
            config: self.config.clone(),
            innings: views,
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            dls: self.dls.clone(),
        }
    }

    /// First innings bats team A; the second and any super over bat team B
    pub fn batting_team(&self, selector: InningsSelector) -> String {
        match selector {
            InningsSelector::First => self.config.team_a.clone(),
            InningsSelector::Second | InningsSelector::SuperOver => self.config.team_b.clone(),
        }
    }

    fn lens(&self) -> [usize; 3] {
        [
            self.innings[0].as_ref().map(Innings::live_len).unwrap_or(0),
            self.innings[1].as_ref().map(Innings::live_len).unwrap_or(0),
            self.innings[2].as_ref().map(Innings::live_len).unwrap_or(0),
        ]
    }

    fn changed_index(from: [usize; 3], to: [usize; 3]) -> Option<usize> {
        (0..3).find(|&i| from[i] != to[i])
    }

    fn discard_redo_branch(&mut self) {
        if self.can_redo() {
            self.history.truncate(self.cursor + 1);
            for innings in self.innings.iter_mut().flatten() {
                innings.discard_redo_tail();
            }
        }
    }
}
