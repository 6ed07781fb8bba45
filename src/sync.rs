use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::scoring::{BallCall, BallDiff, InningsSelector, MatchScoringSession};

/// A delivery recorded while the scorer was offline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedBall {
    /// Client-assigned id so the scorer can match outcomes to its queue
    pub ball_id: Uuid,
    /// Innings log length the scorer observed before this ball
    pub seq: usize,
    /// Slot the scorer recorded the ball at
    pub over: u32,
    pub ball_in_over: u32,
    pub innings: InningsSelector,
    pub call: BallCall,
    pub recorded_at: DateTime<Utc>,
}

/// Client-side buffer of balls recorded while disconnected.
///
/// Each entry pins the sequence index and over.ball slot it was scored
/// at, so the server can verify nothing moved underneath the scorer
/// before accepting the ball into the canonical log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfflineQueue {
    balls: Vec<QueuedBall>,
}

impl OfflineQueue {
    pub fn new() -> Self {
        Self { balls: Vec::new() }
    }

    /// Record a ball against the scorer's local innings view
    pub fn enqueue(
        &mut self,
        innings: InningsSelector,
        seq: usize,
        over: u32,
        ball_in_over: u32,
        call: BallCall,
    ) -> Uuid {
        let ball_id = Uuid::new_v4();
        self.balls.push(QueuedBall {
            ball_id,
            seq,
            over,
            ball_in_over,
            innings,
            call,
            recorded_at: Utc::now(),
        });
        ball_id
    }

    pub fn balls(&self) -> &[QueuedBall] {
        &self.balls
    }

    pub fn len(&self) -> usize {
        self.balls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balls.is_empty()
    }

    /// Drop the leading entries the server accepted
    pub fn drain_accepted(&mut self, count: usize) {
        self.balls.drain(..count.min(self.balls.len()));
    }
}

/// Result of replaying an offline queue against the live session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub accepted: Vec<BallDiff>,
    /// Set when replay stopped early; the queue from this ball onward was
    /// not applied
    pub conflict: Option<ReconcileConflict>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.conflict.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConflict {
    pub queued_ball_id: Uuid,
    pub over: u32,
    pub ball_in_over: u32,
    pub reason: String,
}

/// Replay an offline queue strictly in order. Each ball must land at the
/// exact sequence index and over.ball slot it was recorded at; the first
/// mismatch stops replay and leaves the rest of the queue untouched.
///
/// First to reconcile wins: whoever replays first re-establishes the
/// canonical log, and a later scorer whose queue has diverged is refused
/// at the first conflicting ball so the humans can adjudicate. Divergent
/// histories are never merged automatically.
#[instrument(skip(session, queue), fields(match_id = %session.config().match_id, queued = queue.len()))]
pub fn replay(session: &mut MatchScoringSession, queue: &[QueuedBall]) -> ReconcileReport {
    let mut accepted = Vec::new();

    for queued in queue {
        match session.add_ball_at(
            queued.innings,
            &queued.call,
            queued.seq,
            queued.over,
            queued.ball_in_over,
        ) {
            Ok(diff) => {
                debug!(
                    queued_ball_id = %queued.ball_id,
                    over = queued.over,
                    ball = queued.ball_in_over,
                    "Replayed queued ball"
                );
                accepted.push(diff);
            }
            Err(e) => {
                warn!(
                    queued_ball_id = %queued.ball_id,
                    error = %e,
                    "Offline queue diverged from the live log"
                );
                return ReconcileReport {
                    accepted,
                    conflict: Some(ReconcileConflict {
                        queued_ball_id: queued.ball_id,
                        over: queued.over,
                        ball_in_over: queued.ball_in_over,
                        reason: e.to_string(),
                    }),
                };
            }
        }
    }

    info!(accepted = accepted.len(), "Offline queue reconciled");
    ReconcileReport {
        accepted,
        conflict: None,
    }
}
