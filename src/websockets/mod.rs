// Public API
pub use connection_manager::{ConnectionManager, InMemoryConnectionManager};
pub use handler::{websocket_handler, WebsocketReceiveHandler};
pub use messages::{MessageType, WebSocketMessage};
pub use socket::MessageHandler;
pub use websocket_match_subscriber::WebSocketMatchSubscriber;

// Internal modules
mod connection_manager;
mod handler;
pub mod messages;
mod socket;
mod websocket_match_subscriber;
