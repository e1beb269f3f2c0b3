use crate::types::{JobId, LogBlob};
use std::fmt;
use std::time::SystemTime;

/// Where a job is in its start workflow.
///
/// `Stopped` is entered out-of-band when a stop instruction reaches a live job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Starting,
    Streaming,
    Succeeded,
    Failed,
    Stopped,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Stopped)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed,
}

impl Outcome {
    /// The value carried in the `status` header of a status publish.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One read from a container's live output.
#[derive(Clone, Debug)]
pub struct LogChunk {
    pub job_id: JobId,
    pub payload: LogBlob,
    pub produced_at: SystemTime,
}

/// The terminal status of a start workflow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusRecord {
    pub job_id: JobId,
    pub outcome: Outcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_header_values() {
        assert_eq!(Outcome::Success.to_string(), "SUCCESS");
        assert_eq!(Outcome::Failed.as_str(), "FAILED");
    }

    #[test]
    fn terminal_states() {
        assert!(!JobState::Streaming.is_terminal());
        assert!(!JobState::Pending.is_terminal());
        assert!(JobState::Stopped.is_terminal());
        assert!(JobState::Succeeded.is_terminal());
    }
}
