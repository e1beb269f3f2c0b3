use crate::errors;
use crate::events::JobState;
use tokio::sync::oneshot;

pub enum WorkerMessage {
    GetState {
        response: oneshot::Sender<errors::Result<JobState>>,
    },
    Stop {
        response: oneshot::Sender<errors::Result<()>>,
    },
}
