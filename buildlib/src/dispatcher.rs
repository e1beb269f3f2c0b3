use crate::errors::{self, JobError};
use crate::instruction::{Instruction, RawInstruction};
use crate::JobCoordinator;
use futures::{Stream, StreamExt};
use std::convert::TryFrom;
use tracing::{info, warn};

/// Validates inbound instructions and hands them to the coordinator.
///
/// Instructions are handed over in arrival order, but every job workflow runs on
/// its own task, so the dispatcher never waits on the container runtime.
pub struct Dispatcher {
    coordinator: JobCoordinator,
}

impl Dispatcher {
    pub fn new(coordinator: JobCoordinator) -> Self {
        Self { coordinator }
    }

    /// Consume `source` until it closes.
    ///
    /// Returns `Ok` once the source is exhausted; an error means the coordinator is gone.
    pub async fn run<S>(&self, source: S) -> errors::Result<()>
    where
        S: Stream<Item = RawInstruction>,
    {
        futures::pin_mut!(source);
        while let Some(raw) = source.next().await {
            self.dispatch(raw).await?;
        }
        warn!("the instruction source has been closed");
        Ok(())
    }

    pub async fn dispatch(&self, raw: RawInstruction) -> errors::Result<()> {
        let delivery_tag = raw.delivery_tag;
        let instruction = match Instruction::try_from(raw) {
            Ok(instruction) => instruction,
            Err(reason) => {
                warn!(delivery_tag, %reason, "discarding instruction");
                return Ok(());
            }
        };

        match instruction {
            Instruction::Start { job_id, source_ref } => {
                info!(delivery_tag, job_id = %job_id, "start instruction received");
                match self.coordinator.start_job(job_id.clone(), source_ref).await {
                    Ok(_) => {}
                    Err(JobError::CoordinatorExited) => return Err(JobError::CoordinatorExited),
                    Err(err) => warn!(delivery_tag, job_id = %job_id, error = %err, "start rejected"),
                }
            }
            Instruction::Stop { job_id } => {
                info!(delivery_tag, job_id = %job_id, "stop instruction received");
                // the removal task logs its own result
                let _receipt = self.coordinator.stop_job(job_id).await?;
            }
        }
        Ok(())
    }
}
