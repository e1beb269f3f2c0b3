//! Inbound instruction schema, validated once when a message is received.
use crate::errors::InstructionError;
use crate::types::{JobId, SourceRef};
use std::convert::TryFrom;

pub const START: &str = "start";
pub const STOP: &str = "stop";

/// Header values of one inbound message, as extracted by the broker transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawInstruction {
    pub delivery_tag: u64,
    pub action: Option<String>,
    /// `repository` header: the source location handed to the build container.
    pub repository: Option<String>,
    /// `repository-id` header: the job identifier.
    pub repository_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    Start { job_id: JobId, source_ref: SourceRef },
    Stop { job_id: JobId },
}

impl Instruction {
    pub fn job_id(&self) -> &str {
        match self {
            Self::Start { job_id, .. } | Self::Stop { job_id } => job_id,
        }
    }
}

impl TryFrom<RawInstruction> for Instruction {
    type Error = InstructionError;

    fn try_from(raw: RawInstruction) -> Result<Self, Self::Error> {
        let RawInstruction {
            action,
            repository,
            repository_id,
            ..
        } = raw;
        match action.as_deref() {
            None => Err(InstructionError::MissingAction),
            Some(START) => Ok(Self::Start {
                job_id: required(repository_id, START, "repository-id")?,
                source_ref: required(repository, START, "repository")?,
            }),
            Some(STOP) => Ok(Self::Stop {
                job_id: required(repository_id, STOP, "repository-id")?,
            }),
            Some(other) => Err(InstructionError::UnknownAction(other.to_string())),
        }
    }
}

// an empty header is as good as a missing one
fn required(
    value: Option<String>,
    action: &'static str,
    field: &'static str,
) -> Result<String, InstructionError> {
    value
        .filter(|value| !value.is_empty())
        .ok_or(InstructionError::MissingField { action, field })
}
