//! In-memory collaborators for driving the coordinator in tests.
use crate::broadcast::BroadcastChannel;
use crate::errors::{PublishError, RuntimeError};
use crate::events::{JobState, LogChunk, Outcome, StatusRecord};
use crate::runtime::{ContainerRuntime, LogStream};
use crate::types::{ContainerId, JobId};
use crate::JobCoordinator;

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio_stream::wrappers::UnboundedReceiverStream;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    CreateAndStart { job_id: String, source_ref: String },
    OpenLogStream(String),
    ForceRemove(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Published {
    Log { topic: String, job_id: JobId, payload: Bytes },
    Status { topic: String, job_id: JobId, outcome: Outcome },
}

struct Container {
    name: JobId,
    // held open while the scripted output should keep the stream alive
    live: Option<mpsc::UnboundedSender<Result<Bytes, RuntimeError>>>,
}

#[derive(Default)]
struct Script {
    fail_create: bool,
    fail_open: bool,
    fail_read_after: Option<usize>,
    fail_remove: bool,
    hold_open: bool,
    output: Vec<&'static str>,
    create_gate: Option<Arc<Notify>>,
}

#[derive(Default)]
struct FakeState {
    script: Script,
    containers: HashMap<ContainerId, Container>,
    calls: Vec<Call>,
}

/// A container runtime whose behaviour is scripted up front.
#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<FakeState>,
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_output(output: Vec<&'static str>) -> Arc<Self> {
        let runtime = Self::default();
        runtime.state.lock().unwrap().script.output = output;
        Arc::new(runtime)
    }

    pub fn fail_create(&self) {
        self.state.lock().unwrap().script.fail_create = true;
    }

    pub fn fail_open(&self) {
        self.state.lock().unwrap().script.fail_open = true;
    }

    /// The stream errors after yielding `chunks` items.
    pub fn fail_read_after(&self, chunks: usize) {
        self.state.lock().unwrap().script.fail_read_after = Some(chunks);
    }

    /// Removals fail with a daemon error and leave the container running.
    pub fn fail_remove(&self) {
        self.state.lock().unwrap().script.fail_remove = true;
    }

    /// End the held stream of `name` as a container that exits does.
    pub fn finish(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(container) = state.containers.get_mut(&container_id(name)) {
            container.live = None;
        }
    }

    /// Streams stay open until their container is removed.
    pub fn hold_open(&self) {
        self.state.lock().unwrap().script.hold_open = true;
    }

    /// create+start blocks until the returned gate is notified.
    pub fn gate_create(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().unwrap().script.create_gate = Some(gate.clone());
        gate
    }

    /// Pretend a container named `name` already exists.
    pub fn insert_container(&self, name: &str) {
        self.state.lock().unwrap().containers.insert(
            container_id(name),
            Container {
                name: name.to_string(),
                live: None,
            },
        );
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn has_container(&self, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .containers
            .values()
            .any(|container| container.name == name)
    }
}

pub fn container_id(name: &str) -> ContainerId {
    format!("container-{}", name)
}

fn daemon_error(msg: &str) -> RuntimeError {
    RuntimeError::Daemon(Box::new(io::Error::new(io::ErrorKind::Other, msg.to_string())))
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn create_and_start(
        &self,
        job_id: &str,
        source_ref: &str,
    ) -> Result<ContainerId, RuntimeError> {
        let gate = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::CreateAndStart {
                job_id: job_id.to_string(),
                source_ref: source_ref.to_string(),
            });
            state.script.create_gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let mut state = self.state.lock().unwrap();
        if state.script.fail_create {
            return Err(daemon_error("image statikk:build not found"));
        }
        let id = container_id(job_id);
        state.containers.insert(
            id.clone(),
            Container {
                name: job_id.to_string(),
                live: None,
            },
        );
        Ok(id)
    }

    async fn open_log_stream(&self, container: &str) -> Result<LogStream, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::OpenLogStream(container.to_string()));
        if state.script.fail_open {
            return Err(daemon_error("logs unavailable"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        for (n, chunk) in state.script.output.iter().enumerate() {
            if state.script.fail_read_after == Some(n) {
                let _ = tx.send(Err(daemon_error("connection reset")));
                break;
            }
            let _ = tx.send(Ok(Bytes::from_static(chunk.as_bytes())));
        }
        let hold_open = state.script.hold_open;
        match state.containers.get_mut(container) {
            Some(entry) if hold_open => entry.live = Some(tx),
            Some(_) => {}
            None => return Err(RuntimeError::NotFound(container.to_string())),
        }
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn force_remove(&self, container: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ForceRemove(container.to_string()));
        if state.script.fail_remove {
            return Err(daemon_error("daemon busy"));
        }
        let key = state
            .containers
            .iter()
            .find(|(id, entry)| id.as_str() == container || entry.name == container)
            .map(|(id, _)| id.clone());
        match key {
            // dropping the live sender ends the stream, as a removed container does
            Some(key) => {
                state.containers.remove(&key);
                Ok(())
            }
            None => Err(RuntimeError::NotFound(container.to_string())),
        }
    }
}

/// Holds status publishes until released.
#[derive(Default)]
pub struct StatusGate {
    pub reached: Notify,
    pub release: Notify,
}

/// Records every publish in order.
#[derive(Default)]
pub struct RecordingChannel {
    published: Mutex<Vec<Published>>,
    fail_logs: Mutex<bool>,
    status_gate: Mutex<Option<Arc<StatusGate>>>,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_log_publishes(&self) {
        *self.fail_logs.lock().unwrap() = true;
    }

    pub fn gate_statuses(&self) -> Arc<StatusGate> {
        let gate = Arc::new(StatusGate::default());
        *self.status_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    pub fn statuses(&self, job_id: &str) -> Vec<Outcome> {
        self.published()
            .into_iter()
            .filter_map(|published| match published {
                Published::Status {
                    job_id: id,
                    outcome,
                    ..
                } if id == job_id => Some(outcome),
                _ => None,
            })
            .collect()
    }

    pub fn logs(&self, job_id: &str) -> Vec<Bytes> {
        self.published()
            .into_iter()
            .filter_map(|published| match published {
                Published::Log {
                    job_id: id,
                    payload,
                    ..
                } if id == job_id => Some(payload),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl BroadcastChannel for RecordingChannel {
    async fn publish_log(&self, topic: &str, chunk: &LogChunk) -> Result<(), PublishError> {
        if *self.fail_logs.lock().unwrap() {
            return Err(PublishError {
                topic: topic.to_string(),
                source: Box::new(io::Error::new(io::ErrorKind::BrokenPipe, "channel closed")),
            });
        }
        self.published.lock().unwrap().push(Published::Log {
            topic: topic.to_string(),
            job_id: chunk.job_id.clone(),
            payload: chunk.payload.clone(),
        });
        Ok(())
    }

    async fn publish_status(
        &self,
        topic: &str,
        record: &StatusRecord,
    ) -> Result<(), PublishError> {
        let gate = self.status_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.reached.notify_one();
            gate.release.notified().await;
        }
        self.published.lock().unwrap().push(Published::Status {
            topic: topic.to_string(),
            job_id: record.job_id.clone(),
            outcome: record.outcome,
        });
        Ok(())
    }
}

/// Poll until the job reports `expected`.
pub async fn wait_for_state(coordinator: &JobCoordinator, job_id: &str, expected: JobState) {
    for _ in 0..400 {
        if let Ok(state) = coordinator.job_state(job_id.to_string()).await {
            if state == expected {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {} never reached {:?}", job_id, expected);
}
