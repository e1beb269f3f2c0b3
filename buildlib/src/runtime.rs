use crate::errors::RuntimeError;
use crate::types::{ContainerId, LogBlob};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// A container's combined, timestamped stdout/stderr, one item per read.
pub type LogStream = Pin<Box<dyn Stream<Item = Result<LogBlob, RuntimeError>> + Send>>;

/// The container runtime as seen by the build workflow.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create the build container named `job_id` for `source_ref` and start it.
    async fn create_and_start(
        &self,
        job_id: &str,
        source_ref: &str,
    ) -> Result<ContainerId, RuntimeError>;

    /// Open the container's live output, past and future.
    ///
    /// The stream ends when the container stops.
    async fn open_log_stream(&self, container: &str) -> Result<LogStream, RuntimeError>;

    /// Remove a container, killing it first if it is still running.
    async fn force_remove(&self, container: &str) -> Result<(), RuntimeError>;
}
