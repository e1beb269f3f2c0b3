use crate::errors::PublishError;
use crate::events::{LogChunk, StatusRecord};
use async_trait::async_trait;

/// Publish-only fan-out to subscribers of a topic.
///
/// Publishing is fire-and-forget: `Ok` means the broker client accepted the message.
#[async_trait]
pub trait BroadcastChannel: Send + Sync {
    async fn publish_log(&self, topic: &str, chunk: &LogChunk) -> Result<(), PublishError>;

    async fn publish_status(&self, topic: &str, record: &StatusRecord)
        -> Result<(), PublishError>;
}
