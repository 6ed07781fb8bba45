use async_trait::async_trait;
use thiserror::Error;

use super::events::MatchEvent;

/// Errors that can occur when handling match events
#[derive(Debug, Error)]
pub enum MatchEventError {
    #[error("Match not found: {0}")]
    MatchNotFound(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Handler error: {0}")]
    HandlerError(String),
}

/// Trait for components that can handle match events
///
/// This provides a clean interface for reacting to match-specific events
/// without being tied to WebSocket or connection specifics.
#[async_trait]
pub trait MatchEventHandler: Send + Sync {
    /// Handle a match event
    ///
    /// The handler should:
    /// - Process the event appropriately for its purpose
    /// - Handle any necessary state updates or notifications
    /// - Return Ok(()) on success or MatchEventError on failure
    async fn handle_match_event(
        &self,
        match_id: &str,
        event: MatchEvent,
    ) -> Result<(), MatchEventError>;

    /// Get a human-readable name for this handler (for logging/debugging)
    fn handler_name(&self) -> &'static str;
}
