use crate::errors;
use crate::events::JobState;
use crate::types::{JobId, RunId, SourceRef};
use tokio::sync::oneshot;
use tokio_util::task::TaskTracker;

pub enum CoordinatorMessage {
    StartJob {
        job_id: JobId,
        source_ref: SourceRef,
        response: oneshot::Sender<errors::Result<RunId>>,
    },
    StopJob {
        job_id: JobId,
        response: oneshot::Sender<errors::Result<()>>,
    },
    GetState {
        job_id: JobId,
        response: oneshot::Sender<errors::Result<JobState>>,
    },
    Shutdown {
        response: oneshot::Sender<TaskTracker>,
    },
}
