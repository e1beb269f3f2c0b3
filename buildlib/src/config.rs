pub const LOGS_TOPIC: &str = "statikk.build.logs";
pub const STATUS_TOPIC: &str = "statikk.build.status";
pub const UNAVAILABLE_LOGS_NOTICE: &str =
    "Something wrong happened, logs are not available for this build.";

/// Settings shared by every job, built once at startup.
#[derive(Clone, Debug)]
pub struct BuildConfig {
    pub logs_topic: String,
    pub status_topic: String,
    /// Published on the log topic in place of output when the stream cannot be opened.
    pub unavailable_logs_notice: String,
    /// Bound on the coordinator's inbox.
    pub coordinator_capacity: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            logs_topic: LOGS_TOPIC.to_string(),
            status_topic: STATUS_TOPIC.to_string(),
            unavailable_logs_notice: UNAVAILABLE_LOGS_NOTICE.to_string(),
            coordinator_capacity: 64,
        }
    }
}
