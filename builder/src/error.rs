use buildlib::errors::{BoxError, JobError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("cannot connect to {target}: {source}")]
    Connectivity {
        target: &'static str,
        source: BoxError,
    },
    #[error("the instruction source has been closed")]
    SourceClosed,
    #[error(transparent)]
    Coordinator(#[from] JobError),
}

impl WorkerError {
    pub fn connectivity(target: &'static str, err: impl Into<BoxError>) -> Self {
        Self::Connectivity {
            target,
            source: err.into(),
        }
    }
}
