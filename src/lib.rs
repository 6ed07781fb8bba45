// Library crate for the scorebox live cricket scoring server
// This file exposes the public API for integration tests

pub mod event;
pub mod feed;
pub mod room;
pub mod scoring;
pub mod shared;
pub mod store;
pub mod sync;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use event::{EventBus, MatchEvent, MatchSubscription};
pub use room::{MatchRegistry, MatchRoomHandle};
pub use scoring::{BallCall, BallInput, InningsSelector, MatchConfig, MatchState};
pub use shared::{AppError, AppState};
pub use websockets::{
    ConnectionManager, MessageHandler, MessageType, WebSocketMatchSubscriber, WebSocketMessage,
    WebsocketReceiveHandler,
};
