mod actor;
mod messages;

use super::Backends;
use crate::errors::{self, JobError};
use crate::events::JobState;
use crate::runtime::ContainerRuntime;
use crate::types::{JobId, RunId, SourceRef};
use actor::Actor;
use messages::WorkerMessage;
use tokio::sync::{mpsc, oneshot};
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Handle to the task running one job's start workflow.
///
/// Messages sent after the workflow has finished are dropped along with their
/// response senders, so callers observe a closed response channel.
#[derive(Clone)]
pub struct WorkerHandle {
    sender: mpsc::UnboundedSender<WorkerMessage>,
}

impl WorkerHandle {
    /// Spawn the workflow on `tracker`. `exit_tx` receives `(job_id, run_id)` once
    /// the terminal status has been published.
    pub fn spawn(
        tracker: &TaskTracker,
        backends: Backends,
        job_id: JobId,
        source_ref: SourceRef,
        run_id: RunId,
        exit_tx: mpsc::UnboundedSender<(JobId, RunId)>,
    ) -> Self {
        let (sender, inbox) = mpsc::unbounded_channel();
        let actor = Actor::new(inbox, backends, job_id.clone());
        tracker.spawn(async move {
            actor.run(source_ref).await;
            let _ = exit_tx.send((job_id, run_id));
        });
        Self { sender }
    }

    pub fn get_state(&self, response: oneshot::Sender<errors::Result<JobState>>) {
        let _ = self.sender.send(WorkerMessage::GetState { response });
    }

    pub fn stop(&self, response: oneshot::Sender<errors::Result<()>>) {
        let _ = self.sender.send(WorkerMessage::Stop { response });
    }
}

/// Force-remove `container` on behalf of `job_id`, logging the result.
pub async fn remove_container(
    runtime: &dyn ContainerRuntime,
    job_id: &str,
    container: &str,
) -> errors::Result<()> {
    info!(job_id, container, "stopping build container");
    match runtime.force_remove(container).await {
        Ok(()) => {
            info!(job_id, "build stopped");
            Ok(())
        }
        Err(err) => {
            warn!(job_id, error = %err, "cannot remove container");
            Err(JobError::ContainerRemove(err))
        }
    }
}
