mod actor;
mod messages;

use self::{
    actor::JobCoordinator,
    messages::CoordinatorMessage::{self, GetState, Shutdown, StartJob, StopJob},
};
use super::Backends;
use crate::broadcast::BroadcastChannel;
use crate::config::BuildConfig;
use crate::errors::{self, JobError};
use crate::events::JobState;
use crate::runtime::ContainerRuntime;
use crate::types::{JobId, RunId, SourceRef};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Resolves once a stop instruction has been carried out.
pub type StopReceipt = oneshot::Receiver<errors::Result<()>>;

/// A `JobCoordinator` which starts and stops build jobs and answers state queries.
///
/// This struct is an actor handle; the real work is done in the actor spawned by
/// `JobCoordinator::spawn`. It can be cloned freely across tasks. At most one start
/// workflow runs per job id, and a stop aimed at a running job is sequenced by that
/// job's own task.
#[derive(Clone)]
pub struct JobCoordinatorHandle {
    sender: mpsc::Sender<CoordinatorMessage>,
}

impl JobCoordinatorHandle {
    /// Spawn a new coordinator working against `runtime` and `channel`.
    pub fn spawn(
        runtime: Arc<dyn ContainerRuntime>,
        channel: Arc<dyn BroadcastChannel>,
        config: BuildConfig,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.coordinator_capacity);
        let backends = Backends {
            runtime,
            channel,
            config: Arc::new(config),
        };
        JobCoordinator::spawn(receiver, backends);
        Self { sender }
    }

    /// Accept a start instruction and run its workflow in the background.
    ///
    /// Rejected with `AlreadyRunning` while another start of `job_id` is in flight.
    /// An accepted start always ends in exactly one status publish.
    pub async fn start_job(&self, job_id: JobId, source_ref: SourceRef) -> errors::Result<RunId> {
        let (tx, rx) = oneshot::channel();
        self.send(StartJob {
            job_id,
            source_ref,
            response: tx,
        })
        .await?;
        rx.await.map_err(|_| JobError::CoordinatorExited)?
    }

    /// Force-remove the job's container. Returns as soon as the request is queued.
    pub async fn stop_job(&self, job_id: JobId) -> errors::Result<StopReceipt> {
        let (tx, rx) = oneshot::channel();
        self.send(StopJob {
            job_id,
            response: tx,
        })
        .await?;
        Ok(rx)
    }

    pub async fn job_state(&self, job_id: JobId) -> errors::Result<JobState> {
        let (tx, rx) = oneshot::channel();
        self.send(GetState {
            job_id: job_id.clone(),
            response: tx,
        })
        .await?;
        // the worker drops the sender if its workflow ended in the meantime
        rx.await.map_err(|_| JobError::NotFound(job_id))?
    }

    /// Stop accepting starts and wait for every job and removal task to finish.
    pub async fn shutdown(&self) -> errors::Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Shutdown { response: tx }).await?;
        let tracker = rx.await.map_err(|_| JobError::CoordinatorExited)?;
        tracker.wait().await;
        Ok(())
    }

    async fn send(&self, msg: CoordinatorMessage) -> errors::Result<()> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| JobError::CoordinatorExited)
    }
}
