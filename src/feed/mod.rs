// Commentary feed components
//
// Accepted deliveries are pushed to an external ball-by-ball feed. The
// feed sits outside the scoring path: publishing happens on a worker
// queue per match, and a slow or failing feed never blocks scorers.

// Public API - what other modules can use
pub use events::BallFeedEvent;
pub use feeds::{InMemoryFeed, LogFeed};
pub use publisher::{CommentaryFeed, FeedError, FeedPublisher};

// Internal modules
mod events;
mod feeds;
mod publisher;
