use super::messages::WorkerMessage;
use super::remove_container;
use crate::actors::Backends;
use crate::errors::{self, JobError};
use crate::events::{JobState, Outcome, StatusRecord};
use crate::relay::LogRelay;
use crate::runtime::LogStream;
use crate::types::{ContainerId, JobId, SourceRef};

use bytes::Bytes;
use futures::StreamExt;
use std::future::Future;
use tokio::{
    select,
    sync::{mpsc, oneshot},
};
use tracing::{debug, error, info, warn};

pub struct Actor {
    inbox: mpsc::UnboundedReceiver<WorkerMessage>,
    backends: Backends,
    job_id: JobId,
    container_id: Option<ContainerId>,
    state: JobState,
    // create+start has returned, successfully or not
    created: bool,
    // stop requests that arrived before the container existed
    deferred_stops: Vec<oneshot::Sender<errors::Result<()>>>,
}

impl Actor {
    pub fn new(
        inbox: mpsc::UnboundedReceiver<WorkerMessage>,
        backends: Backends,
        job_id: JobId,
    ) -> Self {
        Self {
            inbox,
            backends,
            job_id,
            container_id: None,
            state: JobState::Pending,
            created: false,
            deferred_stops: Vec::new(),
        }
    }

    pub async fn run(mut self, source_ref: SourceRef) {
        let outcome = match self.build(source_ref).await {
            Ok(()) => {
                info!(job_id = %self.job_id, "the build has successfully ended");
                self.state = JobState::Succeeded;
                Outcome::Success
            }
            Err(err) => {
                warn!(job_id = %self.job_id, error = %err, "the build has failed");
                if self.state != JobState::Stopped {
                    self.state = JobState::Failed;
                }
                Outcome::Failed
            }
        };
        self.publish_status(outcome).await;

        // answer whatever was queued behind the last step
        self.inbox.close();
        while let Ok(msg) = self.inbox.try_recv() {
            self.handle_message(msg).await;
        }
    }

    async fn build(&mut self, source_ref: SourceRef) -> errors::Result<()> {
        self.state = JobState::Starting;
        info!(job_id = %self.job_id, "starting build container");
        let runtime = self.backends.runtime.clone();
        let job_id = self.job_id.clone();
        let created = self
            .settle(async move { runtime.create_and_start(&job_id, &source_ref).await })
            .await;
        self.created = true;
        if let Ok(container_id) = &created {
            self.container_id = Some(container_id.clone());
        }
        self.apply_deferred_stops().await;
        let container_id = created.map_err(JobError::ContainerStart)?;
        if self.state == JobState::Stopped {
            return Err(JobError::Stopped);
        }

        self.state = JobState::Streaming;
        let runtime = self.backends.runtime.clone();
        let opened = self
            .settle(async move { runtime.open_log_stream(&container_id).await })
            .await;
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(err) => {
                let notice = Bytes::from(self.backends.config.unavailable_logs_notice.clone());
                if let Err(publish_err) = self.relay().write(notice).await {
                    error!(job_id = %self.job_id, error = %publish_err, "cannot publish log notice");
                }
                return Err(JobError::LogStreamOpen(err));
            }
        };
        if self.state == JobState::Stopped {
            return Err(JobError::Stopped);
        }

        self.drain(&mut stream).await?;
        // a removed container ends its stream like a finished one
        if self.state == JobState::Stopped {
            return Err(JobError::Stopped);
        }
        Ok(())
    }

    /// Relay the stream to the log topic in read order until it ends.
    async fn drain(&mut self, stream: &mut LogStream) -> errors::Result<()> {
        let relay = self.relay();
        loop {
            select! {
                next = stream.next() => match next {
                    Some(Ok(blob)) => relay.write(blob).await?,
                    Some(Err(err)) => return Err(JobError::LogStreamRead(err)),
                    None => return Ok(()),
                },
                Some(msg) = self.inbox.recv() => self.handle_message(msg).await,
            }
        }
    }

    /// Await a runtime call while still serving the inbox.
    async fn settle<F: Future>(&mut self, fut: F) -> F::Output {
        tokio::pin!(fut);
        loop {
            select! {
                output = &mut fut => return output,
                Some(msg) = self.inbox.recv() => self.handle_message(msg).await,
            }
        }
    }

    async fn handle_message(&mut self, msg: WorkerMessage) {
        use WorkerMessage::*;
        match msg {
            GetState { response } => {
                let _ = response.send(Ok(self.state));
            }
            Stop { response } => {
                if self.created {
                    let removed = self.remove().await;
                    self.record_stop(&removed);
                    let _ = response.send(removed);
                } else {
                    debug!(job_id = %self.job_id, "stop deferred until the container is created");
                    self.deferred_stops.push(response);
                }
            }
        }
    }

    async fn apply_deferred_stops(&mut self) {
        for response in std::mem::take(&mut self.deferred_stops) {
            let removed = self.remove().await;
            self.record_stop(&removed);
            let _ = response.send(removed);
        }
    }

    // a container that survived its removal keeps the build running
    fn record_stop(&mut self, removed: &errors::Result<()>) {
        if removed.is_ok() && !self.state.is_terminal() {
            self.state = JobState::Stopped;
        }
    }

    // create may have failed after the container was made, so fall back to its name
    async fn remove(&self) -> errors::Result<()> {
        let container = self.container_id.as_deref().unwrap_or(self.job_id.as_str());
        remove_container(self.backends.runtime.as_ref(), &self.job_id, container).await
    }

    fn relay(&self) -> LogRelay {
        LogRelay::new(
            self.backends.channel.clone(),
            self.backends.config.logs_topic.clone(),
            self.job_id.clone(),
        )
    }

    async fn publish_status(&self, outcome: Outcome) {
        let record = StatusRecord {
            job_id: self.job_id.clone(),
            outcome,
        };
        let topic = &self.backends.config.status_topic;
        if let Err(err) = self.backends.channel.publish_status(topic, &record).await {
            error!(job_id = %self.job_id, error = %err, "failed to send build status");
        }
    }
}
