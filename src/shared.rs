use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::event::EventBus;
use crate::feed::CommentaryFeed;
use crate::room::{MatchRegistry, RoomError};
use crate::scoring::ScoringError;
use crate::store::MatchStore;
use crate::websockets::{ConnectionManager, WebSocketMatchSubscriber};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub registry: MatchRegistry,
    pub connection_manager: Arc<dyn ConnectionManager + Send + Sync>,
    pub store: Arc<dyn MatchStore + Send + Sync>,
    pub feed: Arc<dyn CommentaryFeed>,
    pub event_bus: EventBus,
    pub ws_subscriber: Arc<WebSocketMatchSubscriber>,
}

impl AppState {
    pub fn new(
        registry: MatchRegistry,
        connection_manager: Arc<dyn ConnectionManager + Send + Sync>,
        store: Arc<dyn MatchStore + Send + Sync>,
        feed: Arc<dyn CommentaryFeed>,
        event_bus: EventBus,
    ) -> Self {
        let ws_subscriber = Arc::new(WebSocketMatchSubscriber::new(
            connection_manager.clone(),
            event_bus.clone(),
        ));
        Self {
            registry,
            connection_manager,
            store,
            feed,
            event_bus,
            ws_subscriber,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

/// Scoring rejections map onto the HTTP surface: an unknown innings is a
/// missing resource, everything else is a conflict with the live log.
impl From<ScoringError> for AppError {
    fn from(e: ScoringError) -> Self {
        match e {
            ScoringError::UnknownInnings(_) => AppError::NotFound(e.to_string()),
            _ => AppError::Conflict(e.to_string()),
        }
    }
}

/// A closed command channel means the room has been retired
impl From<RoomError> for AppError {
    fn from(e: RoomError) -> Self {
        match e {
            RoomError::Scoring(e) => AppError::from(e),
            RoomError::ChannelClosed => AppError::NotFound("Match room closed".to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", msg),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::feed::InMemoryFeed;
    use crate::store::InMemoryMatchStore;
    use crate::websockets::InMemoryConnectionManager;

    /// Builder for creating AppState with overrides for testing
    pub struct AppStateBuilder {
        connection_manager: Option<Arc<dyn ConnectionManager + Send + Sync>>,
        store: Option<Arc<dyn MatchStore + Send + Sync>>,
        feed: Option<Arc<dyn CommentaryFeed>>,
        event_bus: Option<EventBus>,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            Self {
                connection_manager: None,
                store: None,
                feed: None,
                event_bus: None,
            }
        }

        pub fn with_connection_manager(
            mut self,
            manager: Arc<dyn ConnectionManager + Send + Sync>,
        ) -> Self {
            self.connection_manager = Some(manager);
            self
        }

        pub fn with_store(mut self, store: Arc<dyn MatchStore + Send + Sync>) -> Self {
            self.store = Some(store);
            self
        }

        pub fn with_feed(mut self, feed: Arc<dyn CommentaryFeed>) -> Self {
            self.feed = Some(feed);
            self
        }

        pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
            self.event_bus = Some(event_bus);
            self
        }

        pub fn build(self) -> AppState {
            let event_bus = self.event_bus.unwrap_or_else(EventBus::new);
            let store = self
                .store
                .unwrap_or_else(|| Arc::new(InMemoryMatchStore::new()));
            let feed = self.feed.unwrap_or_else(|| Arc::new(InMemoryFeed::new()));
            let connection_manager = self
                .connection_manager
                .unwrap_or_else(|| Arc::new(InMemoryConnectionManager::new()));

            AppState::new(
                MatchRegistry::new(event_bus.clone(), store.clone(), feed.clone()),
                connection_manager,
                store,
                feed,
                event_bus,
            )
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}
