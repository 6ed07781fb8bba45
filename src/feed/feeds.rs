use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use super::events::BallFeedEvent;
use super::publisher::{CommentaryFeed, FeedError};

/// Feed that writes ball-by-ball lines to the application log
///
/// This is the default feed when no external integration is configured,
/// which keeps the publish path exercised in every deployment.
pub struct LogFeed;

#[async_trait]
impl CommentaryFeed for LogFeed {
    async fn publish(&self, event: &BallFeedEvent) -> Result<(), FeedError> {
        info!(
            match_id = %event.match_id,
            innings = %event.innings,
            seq = event.seq,
            "{}",
            event.headline()
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "LogFeed"
    }
}

/// Feed that captures published events in memory, for tests
#[derive(Default)]
pub struct InMemoryFeed {
    published: Mutex<Vec<BallFeedEvent>>,
}

impl InMemoryFeed {
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
        }
    }

    /// All events published so far, in publish order
    pub fn published(&self) -> Vec<BallFeedEvent> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommentaryFeed for InMemoryFeed {
    async fn publish(&self, event: &BallFeedEvent) -> Result<(), FeedError> {
        self.published.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "InMemoryFeed"
    }
}
