use uuid::Uuid;

pub type JobId = String;
pub type SourceRef = String;
pub type ContainerId = String;
pub type LogBlob = bytes::Bytes;
/// Identifies one accepted Start of a job, so a finished run never evicts a later one.
pub type RunId = Uuid;
