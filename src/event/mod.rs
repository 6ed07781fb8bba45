// Event-driven architecture components
//
// This module provides the core infrastructure for event-driven communication
// between different parts of the scoring server.

// Public API - what other modules can use
pub use bus::EventBus;
pub use events::MatchEvent;
pub use handler::{MatchEventError, MatchEventHandler};
pub use subscription::MatchSubscription;

// Internal modules
mod bus;
mod events;
mod handler;
mod subscription;
