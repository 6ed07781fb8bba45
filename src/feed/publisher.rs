use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

use async_trait::async_trait;
use thiserror::Error;

use super::events::BallFeedEvent;

/// Errors that can occur when publishing to a commentary feed
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Feed timed out")]
    Timeout,

    #[error("Retryable error: {0}")]
    Retryable(String),

    #[error("Non-retryable error: {0}")]
    NonRetryable(String),
}

impl FeedError {
    /// Whether this error indicates the publish should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, FeedError::Retryable(_) | FeedError::Timeout)
    }

    /// Create a retryable error
    pub fn retryable(msg: impl Into<String>) -> Self {
        FeedError::Retryable(msg.into())
    }

    /// Create a non-retryable error
    pub fn non_retryable(msg: impl Into<String>) -> Self {
        FeedError::NonRetryable(msg.into())
    }
}

/// Trait for external ball-by-ball commentary surfaces
///
/// Implementations should be idempotent where possible - publishing the
/// same delivery twice should be safe, since a retried publish may have
/// partially succeeded before failing.
#[async_trait]
pub trait CommentaryFeed: Send + Sync {
    /// Publish a single delivery to the feed
    async fn publish(&self, event: &BallFeedEvent) -> Result<(), FeedError>;

    /// Get a human-readable name for this feed (for logging/debugging)
    fn name(&self) -> &'static str;
}

/// Publishes deliveries to a commentary feed with timeout and retry
///
/// The publisher is the boundary between the scoring path and the outside
/// world: the match room queues deliveries to a worker, the worker drives
/// this publisher, and a feed outage costs retries on the worker's tail
/// rather than latency on a scorer's next ball.
pub struct FeedPublisher {
    feed: Arc<dyn CommentaryFeed>,
    publish_timeout: Duration,
    max_retries: u32,
}

impl FeedPublisher {
    pub fn new(feed: Arc<dyn CommentaryFeed>) -> Self {
        Self {
            feed,
            publish_timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    /// Set the timeout for an individual publish attempt
    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// Set the maximum number of retries for failed publishes
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Publish a delivery with retry logic and timeout
    pub async fn publish_with_retry(&self, event: &BallFeedEvent) -> Result<(), FeedError> {
        let feed_name = self.feed.name();
        let match_id = event.match_id.as_str();

        for attempt in 0..=self.max_retries {
            match timeout(self.publish_timeout, self.feed.publish(event)).await {
                Ok(Ok(())) => {
                    if attempt > 0 {
                        info!(
                            feed = feed_name,
                            match_id = match_id,
                            ball = %event.ball,
                            attempt = attempt + 1,
                            "Feed publish succeeded after retry"
                        );
                    }
                    return Ok(());
                }
                Ok(Err(e)) if e.is_retryable() && attempt < self.max_retries => {
                    warn!(
                        feed = feed_name,
                        match_id = match_id,
                        ball = %event.ball,
                        attempt = attempt + 1,
                        error = ?e,
                        "Feed publish failed, will retry"
                    );

                    // Exponential backoff
                    let delay = Duration::from_millis(100 * 2_u64.pow(attempt));
                    tokio::time::sleep(delay).await;
                }
                Ok(Err(e)) => {
                    error!(
                        feed = feed_name,
                        match_id = match_id,
                        ball = %event.ball,
                        attempt = attempt + 1,
                        error = ?e,
                        "Feed publish failed permanently"
                    );
                    return Err(e);
                }
                Err(_timeout) => {
                    if attempt < self.max_retries {
                        warn!(
                            feed = feed_name,
                            match_id = match_id,
                            ball = %event.ball,
                            attempt = attempt + 1,
                            "Feed publish timed out, will retry"
                        );
                        continue;
                    } else {
                        error!(
                            feed = feed_name,
                            match_id = match_id,
                            ball = %event.ball,
                            "Feed publish timed out permanently"
                        );
                        return Err(FeedError::Timeout);
                    }
                }
            }
        }

        unreachable!("Loop should have returned by now");
    }
}
