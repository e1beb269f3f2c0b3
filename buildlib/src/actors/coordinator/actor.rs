use super::messages::CoordinatorMessage;
use crate::actors::worker::{remove_container, WorkerHandle};
use crate::actors::Backends;
use crate::errors::{self, JobError};
use crate::events::JobState;
use crate::types::{JobId, RunId, SourceRef};
use std::collections::HashMap;
use tokio::select;
use tokio::sync::{mpsc, oneshot};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

struct Entry {
    run_id: RunId,
    worker: WorkerHandle,
}

/// Owns the registry of live jobs. Never performs runtime I/O itself: every
/// workflow and every removal runs on its own tracked task.
pub struct JobCoordinator {
    inbox: mpsc::Receiver<CoordinatorMessage>,
    exit_tx: mpsc::UnboundedSender<(JobId, RunId)>,
    exit_rx: mpsc::UnboundedReceiver<(JobId, RunId)>,
    workers: HashMap<JobId, Entry>,
    backends: Backends,
    tracker: TaskTracker,
    accepting: bool,
}

impl JobCoordinator {
    pub fn spawn(inbox: mpsc::Receiver<CoordinatorMessage>, backends: Backends) {
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();
        let actor = Self {
            inbox,
            exit_tx,
            exit_rx,
            workers: HashMap::new(),
            backends,
            tracker: TaskTracker::new(),
            accepting: true,
        };
        tokio::spawn(async move { actor.run().await });
    }

    async fn run(mut self) {
        use self::CoordinatorMessage::*;
        loop {
            select! {
                maybe_msg = self.inbox.recv() => {
                    let msg = match maybe_msg {
                        Some(msg) => msg,
                        // every handle is gone; tracked tasks finish on their own
                        None => return,
                    };
                    match msg {
                        StartJob { job_id, source_ref, response } => {
                            let _ = response.send(self.start_job(job_id, source_ref));
                        }
                        StopJob { job_id, response } => self.stop_job(job_id, response),
                        GetState { job_id, response } => self.get_job_state(job_id, response),
                        Shutdown { response } => {
                            info!(running = self.workers.len(), "coordinator shutting down");
                            self.accepting = false;
                            self.tracker.close();
                            let _ = response.send(self.tracker.clone());
                        }
                    }
                }
                Some((job_id, run_id)) = self.exit_rx.recv() => self.reap(job_id, run_id),
            }
        }
    }

    fn start_job(&mut self, job_id: JobId, source_ref: SourceRef) -> errors::Result<RunId> {
        if !self.accepting {
            return Err(JobError::ShuttingDown);
        }
        if self.workers.contains_key(&job_id) {
            return Err(JobError::AlreadyRunning(job_id));
        }
        let run_id = uuid::Uuid::new_v4();
        let worker = WorkerHandle::spawn(
            &self.tracker,
            self.backends.clone(),
            job_id.clone(),
            source_ref,
            run_id,
            self.exit_tx.clone(),
        );
        debug!(job_id = %job_id, run_id = %run_id, "job registered");
        self.workers.insert(job_id, Entry { run_id, worker });
        Ok(run_id)
    }

    fn stop_job(&mut self, job_id: JobId, response: oneshot::Sender<errors::Result<()>>) {
        // queued on the worker before any later message for the same job
        let forwarded = self.workers.get(&job_id).map(|entry| {
            let (tx, rx) = oneshot::channel();
            entry.worker.stop(tx);
            rx
        });
        let runtime = self.backends.runtime.clone();
        self.tracker.spawn(async move {
            let result = match forwarded {
                Some(rx) => match rx.await {
                    Ok(result) => result,
                    // the workflow ended before it saw the request
                    Err(_) => remove_container(runtime.as_ref(), &job_id, &job_id).await,
                },
                None => remove_container(runtime.as_ref(), &job_id, &job_id).await,
            };
            let _ = response.send(result);
        });
    }

    fn get_job_state(
        &mut self,
        job_id: JobId,
        response: oneshot::Sender<errors::Result<JobState>>,
    ) {
        if let Some(entry) = self.workers.get(&job_id) {
            entry.worker.get_state(response);
        } else {
            let _ = response.send(Err(JobError::NotFound(job_id)));
        }
    }

    fn reap(&mut self, job_id: JobId, run_id: RunId) {
        match self.workers.get(&job_id) {
            Some(entry) if entry.run_id == run_id => {
                self.workers.remove(&job_id);
                debug!(job_id = %job_id, run_id = %run_id, "job finished");
            }
            _ => warn!(job_id = %job_id, run_id = %run_id, "finished run is not registered"),
        }
    }
}
