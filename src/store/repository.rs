use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::models::{BallRow, InningsSnapshotRow};
use crate::scoring::{BallInput, InningsSelector, InningsStatus, WicketKind};
use crate::shared::AppError;

/// Trait for match persistence operations
#[async_trait]
pub trait MatchStore {
    async fn append_ball(&self, row: &BallRow) -> Result<(), AppError>;
    async fn set_ball_voided(
        &self,
        match_id: &str,
        ball_id: Uuid,
        voided: bool,
    ) -> Result<(), AppError>;
    /// Void every live ball of one innings; returns how many were voided
    async fn void_innings(
        &self,
        match_id: &str,
        innings: InningsSelector,
    ) -> Result<u64, AppError>;
    async fn load_balls(&self, match_id: &str) -> Result<Vec<BallRow>, AppError>;
    async fn upsert_innings(&self, snapshot: &InningsSnapshotRow) -> Result<(), AppError>;
    /// Denormalized scoreboards for cheap match listing
    async fn load_innings(&self, match_id: &str) -> Result<Vec<InningsSnapshotRow>, AppError>;
}

/// In-memory implementation of MatchStore for development and testing
///
/// This provides a realistic implementation that can be used in development
/// without requiring a real database connection. Data is stored in memory
/// and will be lost when the application restarts.
pub struct InMemoryMatchStore {
    balls: Mutex<Vec<BallRow>>,
    snapshots: Mutex<HashMap<(String, InningsSelector), InningsSnapshotRow>>,
}

impl Default for InMemoryMatchStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMatchStore {
    /// Creates a new empty in-memory store
    pub fn new() -> Self {
        Self {
            balls: Mutex::new(Vec::new()),
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the number of stored deliveries across all matches
    pub fn ball_count(&self) -> usize {
        self.balls.lock().unwrap().len()
    }

    /// Latest stored scoreboard snapshot for one innings
    pub fn snapshot(&self, match_id: &str, innings: InningsSelector) -> Option<InningsSnapshotRow> {
        self.snapshots
            .lock()
            .unwrap()
            .get(&(match_id.to_string(), innings))
            .cloned()
    }
}

#[async_trait]
impl MatchStore for InMemoryMatchStore {
    #[instrument(skip(self, row))]
    async fn append_ball(&self, row: &BallRow) -> Result<(), AppError> {
        debug!(match_id = %row.match_id, ball_id = %row.ball_id, "Appending ball in memory");

        let mut balls = self.balls.lock().unwrap();
        if balls
            .iter()
            .any(|b| b.match_id == row.match_id && b.ball_id == row.ball_id)
        {
            warn!(ball_id = %row.ball_id, "Ball already stored in memory");
            return Err(AppError::DatabaseError("Ball already stored".to_string()));
        }
        balls.push(row.clone());

        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_ball_voided(
        &self,
        match_id: &str,
        ball_id: Uuid,
        voided: bool,
    ) -> Result<(), AppError> {
        debug!(match_id = %match_id, ball_id = %ball_id, voided = voided, "Marking ball in memory");

        let mut balls = self.balls.lock().unwrap();
        match balls
            .iter_mut()
            .find(|b| b.match_id == match_id && b.ball_id == ball_id)
        {
            Some(ball) => {
                ball.voided = voided;
                Ok(())
            }
            None => {
                warn!(ball_id = %ball_id, "Ball not found for voiding in memory");
                Err(AppError::NotFound("Ball not found".to_string()))
            }
        }
    }

    #[instrument(skip(self))]
    async fn void_innings(
        &self,
        match_id: &str,
        innings: InningsSelector,
    ) -> Result<u64, AppError> {
        debug!(match_id = %match_id, innings = %innings, "Voiding innings in memory");

        let mut balls = self.balls.lock().unwrap();
        let mut voided = 0u64;
        for ball in balls
            .iter_mut()
            .filter(|b| b.match_id == match_id && b.innings == innings && !b.voided)
        {
            ball.voided = true;
            voided += 1;
        }

        Ok(voided)
    }

    #[instrument(skip(self))]
    async fn load_balls(&self, match_id: &str) -> Result<Vec<BallRow>, AppError> {
        debug!(match_id = %match_id, "Loading balls from memory");

        let balls = self.balls.lock().unwrap();
        let mut rows: Vec<BallRow> = balls
            .iter()
            .filter(|b| b.match_id == match_id)
            .cloned()
            .collect();
        rows.sort_by_key(|b| (b.innings.index(), b.seq, b.recorded_at));

        Ok(rows)
    }

    #[instrument(skip(self, snapshot))]
    async fn upsert_innings(&self, snapshot: &InningsSnapshotRow) -> Result<(), AppError> {
        debug!(
            match_id = %snapshot.match_id,
            innings = %snapshot.innings,
            "Upserting innings snapshot in memory"
        );

        self.snapshots.lock().unwrap().insert(
            (snapshot.match_id.clone(), snapshot.innings),
            snapshot.clone(),
        );

        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_innings(&self, match_id: &str) -> Result<Vec<InningsSnapshotRow>, AppError> {
        let snapshots = self.snapshots.lock().unwrap();
        let mut rows: Vec<InningsSnapshotRow> = snapshots
            .values()
            .filter(|s| s.match_id == match_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.innings.index());

        Ok(rows)
    }
}

/// PostgreSQL implementation of match persistence
pub struct PostgresMatchStore {
    pool: PgPool,
}

impl PostgresMatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_ball(row: &PgRow) -> Result<BallRow, AppError> {
        let innings_token: String = row.get("innings");
        let input_token: String = row.get("input");
        let wicket_token: Option<String> = row.get("wicket");

        Ok(BallRow {
            ball_id: row.get("ball_id"),
            match_id: row.get("match_id"),
            innings: InningsSelector::try_from(innings_token.as_str())
                .map_err(|t| AppError::DatabaseError(format!("Unknown innings token: {}", t)))?,
            seq: row.get::<i64, _>("seq") as usize,
            input: BallInput::try_from(input_token.as_str())
                .map_err(|t| AppError::DatabaseError(format!("Unknown input token: {}", t)))?,
            runs: row.get::<i32, _>("runs") as u32,
            over: row.get::<i32, _>("over_number") as u32,
            ball_in_over: row.get::<i32, _>("ball_in_over") as u32,
            is_wide: row.get("is_wide"),
            is_no_ball: row.get("is_no_ball"),
            is_bye: row.get("is_bye"),
            is_leg_bye: row.get("is_leg_bye"),
            is_wicket: row.get("is_wicket"),
            wicket: wicket_token
                .as_deref()
                .map(WicketKind::try_from)
                .transpose()
                .map_err(|t| AppError::DatabaseError(format!("Unknown wicket token: {}", t)))?,
            batsman_id: row.get("batsman_id"),
            bowler_id: row.get("bowler_id"),
            voided: row.get("voided"),
            recorded_at: row.get("recorded_at"),
        })
    }

    fn row_to_snapshot(row: &PgRow) -> Result<InningsSnapshotRow, AppError> {
        let innings_token: String = row.get("innings");
        let status_token: String = row.get("status");

        Ok(InningsSnapshotRow {
            match_id: row.get("match_id"),
            innings: InningsSelector::try_from(innings_token.as_str())
                .map_err(|t| AppError::DatabaseError(format!("Unknown innings token: {}", t)))?,
            status: InningsStatus::try_from(status_token.as_str())
                .map_err(|t| AppError::DatabaseError(format!("Unknown status token: {}", t)))?,
            total_runs: row.get::<i32, _>("total_runs") as u32,
            total_wickets: row.get::<i32, _>("total_wickets") as u32,
            total_balls: row.get::<i32, _>("total_balls") as u32,
            current_over: row.get::<i32, _>("current_over") as u32,
            current_ball: row.get::<i32, _>("current_ball") as u32,
            wides: row.get::<i32, _>("wides") as u32,
            no_balls: row.get::<i32, _>("no_balls") as u32,
            byes: row.get::<i32, _>("byes") as u32,
            leg_byes: row.get::<i32, _>("leg_byes") as u32,
            fours: row.get::<i32, _>("fours") as u32,
            sixes: row.get::<i32, _>("sixes") as u32,
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl MatchStore for PostgresMatchStore {
    #[instrument(skip(self, row))]
    async fn append_ball(&self, row: &BallRow) -> Result<(), AppError> {
        debug!(match_id = %row.match_id, ball_id = %row.ball_id, "Appending ball in database");

        sqlx::query(
            "INSERT INTO match_balls (ball_id, match_id, innings, seq, input, runs, over_number, ball_in_over, is_wide, is_no_ball, is_bye, is_leg_bye, is_wicket, wicket, batsman_id, bowler_id, voided, recorded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"
        )
        .bind(row.ball_id)
        .bind(&row.match_id)
        .bind(row.innings.to_string())
        .bind(row.seq as i64)
        .bind(row.input.to_string())
        .bind(row.runs as i32)
        .bind(row.over as i32)
        .bind(row.ball_in_over as i32)
        .bind(row.is_wide)
        .bind(row.is_no_ball)
        .bind(row.is_bye)
        .bind(row.is_leg_bye)
        .bind(row.is_wicket)
        .bind(row.wicket.map(|w| w.to_string()))
        .bind(&row.batsman_id)
        .bind(&row.bowler_id)
        .bind(row.voided)
        .bind(row.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to append ball in database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_ball_voided(
        &self,
        match_id: &str,
        ball_id: Uuid,
        voided: bool,
    ) -> Result<(), AppError> {
        debug!(match_id = %match_id, ball_id = %ball_id, voided = voided, "Marking ball in database");

        let result =
            sqlx::query("UPDATE match_balls SET voided = $3 WHERE match_id = $1 AND ball_id = $2")
                .bind(match_id)
                .bind(ball_id)
                .bind(voided)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    warn!(error = %e, ball_id = %ball_id, "Failed to mark ball in database");
                    AppError::DatabaseError(e.to_string())
                })?;

        if result.rows_affected() == 0 {
            warn!(ball_id = %ball_id, "Ball not found for voiding");
            return Err(AppError::NotFound("Ball not found".to_string()));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn void_innings(
        &self,
        match_id: &str,
        innings: InningsSelector,
    ) -> Result<u64, AppError> {
        debug!(match_id = %match_id, innings = %innings, "Voiding innings in database");

        let result = sqlx::query(
            "UPDATE match_balls SET voided = TRUE WHERE match_id = $1 AND innings = $2 AND voided = FALSE",
        )
        .bind(match_id)
        .bind(innings.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, innings = %innings, "Failed to void innings in database");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn load_balls(&self, match_id: &str) -> Result<Vec<BallRow>, AppError> {
        debug!(match_id = %match_id, "Loading balls from database");

        let rows = sqlx::query(
            "SELECT ball_id, match_id, innings, seq, input, runs, over_number, ball_in_over, is_wide, is_no_ball, is_bye, is_leg_bye, is_wicket, wicket, batsman_id, bowler_id, voided, recorded_at \
             FROM match_balls WHERE match_id = $1 ORDER BY innings, seq, recorded_at"
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, match_id = %match_id, "Failed to load balls from database");
            AppError::DatabaseError(e.to_string())
        })?;

        let mut balls = Vec::with_capacity(rows.len());
        for row in &rows {
            balls.push(Self::row_to_ball(row)?);
        }

        Ok(balls)
    }

    #[instrument(skip(self, snapshot))]
    async fn upsert_innings(&self, snapshot: &InningsSnapshotRow) -> Result<(), AppError> {
        debug!(
            match_id = %snapshot.match_id,
            innings = %snapshot.innings,
            "Upserting innings snapshot in database"
        );

        sqlx::query(
            "INSERT INTO innings_snapshots (match_id, innings, status, total_runs, total_wickets, total_balls, current_over, current_ball, wides, no_balls, byes, leg_byes, fours, sixes, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             ON CONFLICT (match_id, innings) DO UPDATE SET \
             status = EXCLUDED.status, total_runs = EXCLUDED.total_runs, total_wickets = EXCLUDED.total_wickets, \
             total_balls = EXCLUDED.total_balls, current_over = EXCLUDED.current_over, current_ball = EXCLUDED.current_ball, \
             wides = EXCLUDED.wides, no_balls = EXCLUDED.no_balls, byes = EXCLUDED.byes, leg_byes = EXCLUDED.leg_byes, \
             fours = EXCLUDED.fours, sixes = EXCLUDED.sixes, updated_at = EXCLUDED.updated_at"
        )
        .bind(&snapshot.match_id)
        .bind(snapshot.innings.to_string())
        .bind(snapshot.status.to_string())
        .bind(snapshot.total_runs as i32)
        .bind(snapshot.total_wickets as i32)
        .bind(snapshot.total_balls as i32)
        .bind(snapshot.current_over as i32)
        .bind(snapshot.current_ball as i32)
        .bind(snapshot.wides as i32)
        .bind(snapshot.no_balls as i32)
        .bind(snapshot.byes as i32)
        .bind(snapshot.leg_byes as i32)
        .bind(snapshot.fours as i32)
        .bind(snapshot.sixes as i32)
        .bind(snapshot.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to upsert innings snapshot");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_innings(&self, match_id: &str) -> Result<Vec<InningsSnapshotRow>, AppError> {
        let rows = sqlx::query(
            "SELECT match_id, innings, status, total_runs, total_wickets, total_balls, current_over, current_ball, wides, no_balls, byes, leg_byes, fours, sixes, updated_at \
             FROM innings_snapshots WHERE match_id = $1 ORDER BY innings"
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, match_id = %match_id, "Failed to load innings snapshots");
            AppError::DatabaseError(e.to_string())
        })?;

        let mut snapshots = Vec::with_capacity(rows.len());
        for row in &rows {
            snapshots.push(Self::row_to_snapshot(row)?);
        }

        Ok(snapshots)
    }
}
