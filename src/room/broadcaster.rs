use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::event::{EventBus, MatchEvent};
use crate::feed::{BallFeedEvent, CommentaryFeed, FeedPublisher};
use crate::scoring::{
    BallCall, BallDiff, DlsComputation, InningsSelector, InningsStatus, InningsTotals, MatchConfig,
    MatchScoringSession, MatchState, ScoringError,
};
use crate::store::{BallRow, InningsSnapshotRow, MatchStore};
use crate::sync::{self, QueuedBall, ReconcileReport};

use super::types::{ClientRole, MatchSummary};

/// Errors returned by match room commands
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error("Match room closed")]
    ChannelClosed,
}

enum RoomCommand {
    AddBall {
        innings: InningsSelector,
        call: BallCall,
        resp: oneshot::Sender<Result<BallDiff, RoomError>>,
    },
    UndoBall {
        /// When set, the undo only applies if this is still the latest ball
        ball_id: Option<Uuid>,
        resp: oneshot::Sender<Result<BallDiff, RoomError>>,
    },
    RedoBall {
        resp: oneshot::Sender<Result<BallDiff, RoomError>>,
    },
    CompleteInnings {
        innings: InningsSelector,
        resp: oneshot::Sender<Result<MatchState, RoomError>>,
    },
    ResetInnings {
        innings: InningsSelector,
        resp: oneshot::Sender<Result<MatchState, RoomError>>,
    },
    ComputeDls {
        overs_at_start: f64,
        overs_remaining: f64,
        wickets_lost: u32,
        resp: oneshot::Sender<DlsComputation>,
    },
    Reconcile {
        balls: Vec<QueuedBall>,
        resp: oneshot::Sender<ReconcileReport>,
    },
    State {
        resp: oneshot::Sender<MatchState>,
    },
    Join {
        client_id: String,
        name: String,
        role: ClientRole,
        resp: oneshot::Sender<()>,
    },
    Leave {
        client_id: String,
        name: String,
        role: ClientRole,
        resp: oneshot::Sender<()>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

enum PersistMsg {
    Append {
        row: BallRow,
        snapshot: InningsSnapshotRow,
    },
    SetVoided {
        ball_id: Uuid,
        voided: bool,
        snapshot: InningsSnapshotRow,
    },
    VoidInnings {
        innings: InningsSelector,
        snapshot: InningsSnapshotRow,
    },
    UpsertSnapshot {
        snapshot: InningsSnapshotRow,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

enum FeedMsg {
    Publish(BallFeedEvent),
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// Cloneable handle to one live match room.
///
/// All scoring runs on the room's own task, so every command is applied
/// in arrival order and no two scorers can interleave within a ball.
/// Persistence and feed publishing run on separate worker tasks fed by
/// bounded queues; a slow database or feed never blocks scoring.
#[derive(Clone)]
pub struct MatchRoomHandle {
    config: MatchConfig,
    cmd_tx: mpsc::Sender<RoomCommand>,
}

/// Start the room task plus its persistence and feed workers
pub fn spawn_match_room(
    config: MatchConfig,
    event_bus: EventBus,
    store: Arc<dyn MatchStore + Send + Sync>,
    feed: Arc<dyn CommentaryFeed>,
) -> MatchRoomHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<RoomCommand>(256);
    let (persist_tx, persist_rx) = mpsc::channel::<PersistMsg>(64);
    let (feed_tx, feed_rx) = mpsc::channel::<FeedMsg>(64);

    spawn_persistence_worker(config.match_id.clone(), store, persist_rx);
    spawn_feed_worker(config.match_id.clone(), FeedPublisher::new(feed), feed_rx);

    let session_config = config.clone();
    tokio::spawn(async move {
        let mut session = MatchScoringSession::new(session_config);
        info!(match_id = %session.config().match_id, "Match room started");

        while let Some(cmd) = cmd_rx.recv().await {
            let done = handle_command(cmd, &mut session, &event_bus, &persist_tx, &feed_tx).await;
            if done {
                break;
            }
        }

        info!(match_id = %session.config().match_id, "Match room stopped");
    });

    MatchRoomHandle { config, cmd_tx }
}

impl MatchRoomHandle {
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn summary(&self) -> MatchSummary {
        MatchSummary::from(&self.config)
    }

    pub async fn add_ball(
        &self,
        innings: InningsSelector,
        call: BallCall,
    ) -> Result<BallDiff, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(RoomCommand::AddBall {
                innings,
                call,
                resp: tx,
            })
            .await
            .map_err(|_| RoomError::ChannelClosed)?;
        rx.await.map_err(|_| RoomError::ChannelClosed)?
    }

    pub async fn undo(&self, ball_id: Option<Uuid>) -> Result<BallDiff, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(RoomCommand::UndoBall { ball_id, resp: tx })
            .await
            .map_err(|_| RoomError::ChannelClosed)?;
        rx.await.map_err(|_| RoomError::ChannelClosed)?
    }

    pub async fn redo(&self) -> Result<BallDiff, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(RoomCommand::RedoBall { resp: tx })
            .await
            .map_err(|_| RoomError::ChannelClosed)?;
        rx.await.map_err(|_| RoomError::ChannelClosed)?
    }

    pub async fn complete_innings(
        &self,
        innings: InningsSelector,
    ) -> Result<MatchState, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(RoomCommand::CompleteInnings { innings, resp: tx })
            .await
            .map_err(|_| RoomError::ChannelClosed)?;
        rx.await.map_err(|_| RoomError::ChannelClosed)?
    }

    pub async fn reset_innings(&self, innings: InningsSelector) -> Result<MatchState, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(RoomCommand::ResetInnings { innings, resp: tx })
            .await
            .map_err(|_| RoomError::ChannelClosed)?;
        rx.await.map_err(|_| RoomError::ChannelClosed)?
    }

    pub async fn compute_dls(
        &self,
        overs_at_start: f64,
        overs_remaining: f64,
        wickets_lost: u32,
    ) -> Result<DlsComputation, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(RoomCommand::ComputeDls {
                overs_at_start,
                overs_remaining,
                wickets_lost,
                resp: tx,
            })
            .await
            .map_err(|_| RoomError::ChannelClosed)?;
        rx.await.map_err(|_| RoomError::ChannelClosed)
    }

    pub async fn reconcile(&self, balls: Vec<QueuedBall>) -> Result<ReconcileReport, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(RoomCommand::Reconcile { balls, resp: tx })
            .await
            .map_err(|_| RoomError::ChannelClosed)?;
        rx.await.map_err(|_| RoomError::ChannelClosed)
    }

    pub async fn state(&self) -> Result<MatchState, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(RoomCommand::State { resp: tx })
            .await
            .map_err(|_| RoomError::ChannelClosed)?;
        rx.await.map_err(|_| RoomError::ChannelClosed)
    }

    pub async fn join(
        &self,
        client_id: String,
        name: String,
        role: ClientRole,
    ) -> Result<(), RoomError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(RoomCommand::Join {
                client_id,
                name,
                role,
                resp: tx,
            })
            .await
            .map_err(|_| RoomError::ChannelClosed)?;
        rx.await.map_err(|_| RoomError::ChannelClosed)
    }

    pub async fn leave(
        &self,
        client_id: String,
        name: String,
        role: ClientRole,
    ) -> Result<(), RoomError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(RoomCommand::Leave {
                client_id,
                name,
                role,
                resp: tx,
            })
            .await
            .map_err(|_| RoomError::ChannelClosed)?;
        rx.await.map_err(|_| RoomError::ChannelClosed)
    }

    pub async fn shutdown(&self) -> Result<(), RoomError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(RoomCommand::Shutdown { resp: tx })
            .await
            .map_err(|_| RoomError::ChannelClosed)?;
        rx.await.map_err(|_| RoomError::ChannelClosed)
    }
}

async fn handle_command(
    cmd: RoomCommand,
    session: &mut MatchScoringSession,
    event_bus: &EventBus,
    persist_tx: &mpsc::Sender<PersistMsg>,
    feed_tx: &mpsc::Sender<FeedMsg>,
) -> bool {
    match cmd {
        RoomCommand::AddBall {
            innings,
            call,
            resp,
        } => {
            let result = session.add_ball(innings, &call);
            match &result {
                Ok(diff) => {
                    fan_out_ball(session, diff, event_bus, persist_tx, feed_tx).await;
                }
                Err(e) => {
                    warn!(match_id = %session.config().match_id, error = %e, "Ball rejected");
                }
            }
            let _ = resp.send(result.map_err(RoomError::from));
        }
        RoomCommand::UndoBall { ball_id, resp } => {
            let result = match ball_id {
                Some(id) => session.undo_ball(id),
                None => session.undo(),
            };
            if let Ok(diff) = &result {
                let match_id = session.config().match_id.clone();
                event_bus
                    .emit_to_match(
                        &match_id,
                        MatchEvent::BallRemoved {
                            match_id: match_id.clone(),
                            innings: diff.innings,
                            ball_id: diff.ball.ball_id,
                            totals: diff.totals,
                        },
                    )
                    .await;
                // The stored row survives an undo; it is voided, not deleted
                enqueue_persist(
                    persist_tx,
                    &match_id,
                    PersistMsg::SetVoided {
                        ball_id: diff.ball.ball_id,
                        voided: true,
                        snapshot: snapshot_for(session, diff.innings),
                    },
                );
            }
            let _ = resp.send(result.map_err(RoomError::from));
        }
        RoomCommand::RedoBall { resp } => {
            let result = session.redo();
            if let Ok(diff) = &result {
                let match_id = session.config().match_id.clone();
                event_bus
                    .emit_to_match(
                        &match_id,
                        MatchEvent::BallAdded {
                            match_id: match_id.clone(),
                            innings: diff.innings,
                            ball: diff.ball.clone(),
                            totals: diff.totals,
                        },
                    )
                    .await;
                enqueue_persist(
                    persist_tx,
                    &match_id,
                    PersistMsg::SetVoided {
                        ball_id: diff.ball.ball_id,
                        voided: false,
                        snapshot: snapshot_for(session, diff.innings),
                    },
                );
                // A redone ball goes back out to the feed
                enqueue_feed(
                    feed_tx,
                    &match_id,
                    FeedMsg::Publish(feed_event_for(session, diff)),
                );
            }
            let _ = resp.send(result.map_err(RoomError::from));
        }
        RoomCommand::CompleteInnings { innings, resp } => {
            let result = match session.complete_innings(innings) {
                Ok(()) => {
                    let match_id = session.config().match_id.clone();
                    let state = session.state();
                    event_bus
                        .emit_to_match(
                            &match_id,
                            MatchEvent::StateUpdated {
                                match_id: match_id.clone(),
                                state: state.clone(),
                            },
                        )
                        .await;
                    enqueue_persist(
                        persist_tx,
                        &match_id,
                        PersistMsg::UpsertSnapshot {
                            snapshot: snapshot_for(session, innings),
                        },
                    );
                    Ok(state)
                }
                Err(e) => Err(RoomError::from(e)),
            };
            let _ = resp.send(result);
        }
        RoomCommand::ResetInnings { innings, resp } => {
            let result = match session.reset_innings(innings) {
                Ok(()) => {
                    let match_id = session.config().match_id.clone();
                    let state = session.state();
                    event_bus
                        .emit_to_match(
                            &match_id,
                            MatchEvent::StateUpdated {
                                match_id: match_id.clone(),
                                state: state.clone(),
                            },
                        )
                        .await;
                    enqueue_persist(
                        persist_tx,
                        &match_id,
                        PersistMsg::VoidInnings {
                            innings,
                            snapshot: snapshot_for(session, innings),
                        },
                    );
                    Ok(state)
                }
                Err(e) => Err(RoomError::from(e)),
            };
            let _ = resp.send(result);
        }
        RoomCommand::ComputeDls {
            overs_at_start,
            overs_remaining,
            wickets_lost,
            resp,
        } => {
            let computation = session.compute_dls(overs_at_start, overs_remaining, wickets_lost);
            let match_id = session.config().match_id.clone();
            info!(
                match_id = %match_id,
                revised_target = computation.revised_target,
                "Revised target computed"
            );
            event_bus
                .emit_to_match(
                    &match_id,
                    MatchEvent::StateUpdated {
                        match_id: match_id.clone(),
                        state: session.state(),
                    },
                )
                .await;
            let _ = resp.send(computation);
        }
        RoomCommand::Reconcile { balls, resp } => {
            let report = sync::replay(session, &balls);
            for diff in &report.accepted {
                fan_out_ball(session, diff, event_bus, persist_tx, feed_tx).await;
            }
            // Connected clients converge on the post-replay state even when
            // only a prefix of the queue was accepted
            if !report.accepted.is_empty() {
                let match_id = session.config().match_id.clone();
                event_bus
                    .emit_to_match(
                        &match_id,
                        MatchEvent::StateUpdated {
                            match_id: match_id.clone(),
                            state: session.state(),
                        },
                    )
                    .await;
            }
            let _ = resp.send(report);
        }
        RoomCommand::State { resp } => {
            let _ = resp.send(session.state());
        }
        RoomCommand::Join {
            client_id,
            name,
            role,
            resp,
        } => {
            let match_id = session.config().match_id.clone();
            debug!(match_id = %match_id, client_id = %client_id, role = %role, "Client joined match room");
            event_bus
                .emit_to_match(
                    &match_id,
                    MatchEvent::ClientJoined {
                        match_id: match_id.clone(),
                        client_id,
                        name,
                        role,
                        state: session.state(),
                    },
                )
                .await;
            let _ = resp.send(());
        }
        RoomCommand::Leave {
            client_id,
            name,
            role,
            resp,
        } => {
            let match_id = session.config().match_id.clone();
            debug!(match_id = %match_id, client_id = %client_id, "Client left match room");
            event_bus
                .emit_to_match(
                    &match_id,
                    MatchEvent::ClientLeft {
                        match_id: match_id.clone(),
                        client_id,
                        name,
                        role,
                    },
                )
                .await;
            let _ = resp.send(());
        }
        RoomCommand::Shutdown { resp } => {
            let (persist_done_tx, persist_done_rx) = oneshot::channel();
            if persist_tx
                .send(PersistMsg::Shutdown {
                    resp: persist_done_tx,
                })
                .await
                .is_ok()
            {
                let _ = persist_done_rx.await;
            }
            let (feed_done_tx, feed_done_rx) = oneshot::channel();
            if feed_tx
                .send(FeedMsg::Shutdown { resp: feed_done_tx })
                .await
                .is_ok()
            {
                let _ = feed_done_rx.await;
            }
            let _ = resp.send(());
            return true;
        }
    }

    false
}

/// Broadcast one accepted ball and hand it to the persistence and feed
/// workers
async fn fan_out_ball(
    session: &MatchScoringSession,
    diff: &BallDiff,
    event_bus: &EventBus,
    persist_tx: &mpsc::Sender<PersistMsg>,
    feed_tx: &mpsc::Sender<FeedMsg>,
) {
    let match_id = session.config().match_id.clone();
    event_bus
        .emit_to_match(
            &match_id,
            MatchEvent::BallAdded {
                match_id: match_id.clone(),
                innings: diff.innings,
                ball: diff.ball.clone(),
                totals: diff.totals,
            },
        )
        .await;

    let row = BallRow::from_record(&match_id, diff.innings, diff.seq, &diff.ball);
    enqueue_persist(
        persist_tx,
        &match_id,
        PersistMsg::Append {
            row,
            snapshot: snapshot_for(session, diff.innings),
        },
    );
    enqueue_feed(
        feed_tx,
        &match_id,
        FeedMsg::Publish(feed_event_for(session, diff)),
    );
}

fn snapshot_for(session: &MatchScoringSession, selector: InningsSelector) -> InningsSnapshotRow {
    let match_id = &session.config().match_id;
    match session.innings(selector) {
        Some(innings) => {
            InningsSnapshotRow::from_totals(match_id, selector, innings.status, innings.totals())
        }
        None => InningsSnapshotRow::from_totals(
            match_id,
            selector,
            InningsStatus::NotStarted,
            &InningsTotals::default(),
        ),
    }
}

fn feed_event_for(session: &MatchScoringSession, diff: &BallDiff) -> BallFeedEvent {
    BallFeedEvent {
        match_id: session.config().match_id.clone(),
        innings: diff.innings,
        seq: diff.seq,
        batting_team: session.batting_team(diff.innings),
        ball: diff.ball.clone(),
        totals: diff.totals,
    }
}

// Scoring never waits on the workers; a full queue drops the message and
// the audit log records the gap
fn enqueue_persist(tx: &mpsc::Sender<PersistMsg>, match_id: &str, msg: PersistMsg) {
    if tx.try_send(msg).is_err() {
        error!(match_id = %match_id, "Persistence queue rejected a write");
    }
}

fn enqueue_feed(tx: &mpsc::Sender<FeedMsg>, match_id: &str, msg: FeedMsg) {
    if tx.try_send(msg).is_err() {
        error!(match_id = %match_id, "Feed queue rejected an event");
    }
}

fn spawn_persistence_worker(
    match_id: String,
    store: Arc<dyn MatchStore + Send + Sync>,
    mut rx: mpsc::Receiver<PersistMsg>,
) {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match msg {
                PersistMsg::Append { row, snapshot } => {
                    if let Err(e) = store.append_ball(&row).await {
                        error!(match_id = %match_id, ball_id = %row.ball_id, error = %e, "Failed to persist ball");
                    }
                    if let Err(e) = store.upsert_innings(&snapshot).await {
                        error!(match_id = %match_id, error = %e, "Failed to persist innings snapshot");
                    }
                }
                PersistMsg::SetVoided {
                    ball_id,
                    voided,
                    snapshot,
                } => {
                    if let Err(e) = store.set_ball_voided(&match_id, ball_id, voided).await {
                        error!(match_id = %match_id, ball_id = %ball_id, error = %e, "Failed to mark ball voided");
                    }
                    if let Err(e) = store.upsert_innings(&snapshot).await {
                        error!(match_id = %match_id, error = %e, "Failed to persist innings snapshot");
                    }
                }
                PersistMsg::VoidInnings { innings, snapshot } => {
                    match store.void_innings(&match_id, innings).await {
                        Ok(voided) => {
                            debug!(match_id = %match_id, innings = %innings, voided = voided, "Voided innings rows")
                        }
                        Err(e) => {
                            error!(match_id = %match_id, innings = %innings, error = %e, "Failed to void innings")
                        }
                    }
                    if let Err(e) = store.upsert_innings(&snapshot).await {
                        error!(match_id = %match_id, error = %e, "Failed to persist innings snapshot");
                    }
                }
                PersistMsg::UpsertSnapshot { snapshot } => {
                    if let Err(e) = store.upsert_innings(&snapshot).await {
                        error!(match_id = %match_id, error = %e, "Failed to persist innings snapshot");
                    }
                }
                PersistMsg::Shutdown { resp } => {
                    let _ = resp.send(());
                    break;
                }
            }
        }
        debug!(match_id = %match_id, "Persistence worker stopped");
    });
}

fn spawn_feed_worker(match_id: String, publisher: FeedPublisher, mut rx: mpsc::Receiver<FeedMsg>) {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match msg {
                FeedMsg::Publish(event) => {
                    if let Err(e) = publisher.publish_with_retry(&event).await {
                        error!(
                            match_id = %match_id,
                            seq = event.seq,
                            error = %e,
                            "Dropping feed event after retries"
                        );
                    }
                }
                FeedMsg::Shutdown { resp } => {
                    let _ = resp.send(());
                    break;
                }
            }
        }
        debug!(match_id = %match_id, "Feed worker stopped");
    });
}
