use crate::broadcast::BroadcastChannel;
use crate::errors::PublishError;
use crate::events::LogChunk;
use crate::types::{JobId, LogBlob};
use std::sync::Arc;
use std::time::SystemTime;

/// Forwards a job's container output to the log topic.
///
/// Every write is exactly one publish; nothing is buffered or coalesced.
pub struct LogRelay {
    channel: Arc<dyn BroadcastChannel>,
    topic: String,
    job_id: JobId,
}

impl LogRelay {
    pub fn new(channel: Arc<dyn BroadcastChannel>, topic: String, job_id: JobId) -> Self {
        Self {
            channel,
            topic,
            job_id,
        }
    }

    pub async fn write(&self, payload: LogBlob) -> Result<(), PublishError> {
        let chunk = LogChunk {
            job_id: self.job_id.clone(),
            payload,
            produced_at: SystemTime::now(),
        };
        self.channel.publish_log(&self.topic, &chunk).await
    }
}
