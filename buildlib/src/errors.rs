use crate::types::{ContainerId, JobId};
use std::{error, result};
use thiserror::Error;

pub type BoxError = Box<dyn error::Error + Send + Sync>;

/// Why an inbound instruction was discarded.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InstructionError {
    #[error("the field `action` is missing from message headers")]
    MissingAction,
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error("the field `{field}` is missing from the headers of a `{action}` message")]
    MissingField {
        action: &'static str,
        field: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("no such container: {0}")]
    NotFound(ContainerId),
    #[error("container runtime error: {0}")]
    Daemon(#[source] BoxError),
}

#[derive(Error, Debug)]
#[error("cannot publish to `{topic}`: {source}")]
pub struct PublishError {
    pub topic: String,
    pub source: BoxError,
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("job {0} is already running")]
    AlreadyRunning(JobId),
    #[error("no running job {0}")]
    NotFound(JobId),
    #[error("the coordinator is shutting down")]
    ShuttingDown,
    #[error("the coordinator has exited")]
    CoordinatorExited,
    #[error("cannot start build container: {0}")]
    ContainerStart(#[source] RuntimeError),
    #[error("cannot open log stream: {0}")]
    LogStreamOpen(#[source] RuntimeError),
    #[error("cannot read log stream: {0}")]
    LogStreamRead(#[source] RuntimeError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("cannot remove container: {0}")]
    ContainerRemove(#[source] RuntimeError),
    #[error("the build was stopped")]
    Stopped,
}

pub type Result<T> = result::Result<T, JobError>;
