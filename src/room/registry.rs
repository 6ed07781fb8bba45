use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::broadcaster::{spawn_match_room, MatchRoomHandle};
use super::types::{CreateMatchRequest, MatchSummary};
use crate::event::EventBus;
use crate::feed::CommentaryFeed;
use crate::scoring::MatchConfig;
use crate::shared::AppError;
use crate::store::MatchStore;

/// Owns every live match room and spawns new ones
#[derive(Clone)]
pub struct MatchRegistry {
    rooms: Arc<RwLock<HashMap<String, MatchRoomHandle>>>,
    event_bus: EventBus,
    store: Arc<dyn MatchStore + Send + Sync>,
    feed: Arc<dyn CommentaryFeed>,
}

impl MatchRegistry {
    pub fn new(
        event_bus: EventBus,
        store: Arc<dyn MatchStore + Send + Sync>,
        feed: Arc<dyn CommentaryFeed>,
    ) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            event_bus,
            store,
            feed,
        }
    }

    /// Opens a match room, generating an id when the request has none
    #[instrument(skip(self, request))]
    pub async fn open_match(&self, request: CreateMatchRequest) -> Result<MatchSummary, AppError> {
        if request.total_overs == 0 {
            return Err(AppError::BadRequest(
                "total_overs must be at least 1".to_string(),
            ));
        }
        if request.team_a.trim().is_empty() || request.team_b.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Both teams need a name".to_string(),
            ));
        }

        let match_id = match request.match_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => Uuid::new_v4().to_string(),
        };
        debug!(match_id = %match_id, "Opening match room");

        let config = MatchConfig {
            match_id: match_id.clone(),
            team_a: request.team_a,
            team_b: request.team_b,
            total_overs: request.total_overs,
        };

        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&match_id) {
            warn!(match_id = %match_id, "Match already exists");
            return Err(AppError::Conflict("Match already exists".to_string()));
        }

        let handle = spawn_match_room(
            config,
            self.event_bus.clone(),
            self.store.clone(),
            self.feed.clone(),
        );
        let summary = handle.summary();
        rooms.insert(match_id.clone(), handle);

        info!(
            match_id = %match_id,
            team_a = %summary.team_a,
            team_b = %summary.team_b,
            "Match room opened"
        );
        Ok(summary)
    }

    pub async fn get(&self, match_id: &str) -> Option<MatchRoomHandle> {
        self.rooms.read().await.get(match_id).cloned()
    }

    /// Room lookup for the API surface
    pub async fn require(&self, match_id: &str) -> Result<MatchRoomHandle, AppError> {
        self.get(match_id)
            .await
            .ok_or_else(|| AppError::NotFound("Match not found".to_string()))
    }

    pub async fn list(&self) -> Vec<MatchSummary> {
        let rooms = self.rooms.read().await;
        let mut summaries: Vec<MatchSummary> = rooms.values().map(|h| h.summary()).collect();
        summaries.sort_by(|a, b| a.match_id.cmp(&b.match_id));
        summaries
    }

    /// Stops the room task and drops its event channel. Stored balls and
    /// snapshots stay readable after retirement.
    #[instrument(skip(self))]
    pub async fn retire(&self, match_id: &str) -> Result<(), AppError> {
        let handle = {
            let mut rooms = self.rooms.write().await;
            rooms
                .remove(match_id)
                .ok_or_else(|| AppError::NotFound("Match not found".to_string()))?
        };

        if handle.shutdown().await.is_err() {
            warn!(match_id = %match_id, "Match room was already stopped");
        }
        self.event_bus.remove_match(match_id).await;

        info!(match_id = %match_id, "Match room retired");
        Ok(())
    }
}
