pub mod coordinator;
mod worker;

use crate::broadcast::BroadcastChannel;
use crate::config::BuildConfig;
use crate::runtime::ContainerRuntime;
use std::sync::Arc;

/// The shared, read-mostly collaborators every job task works against.
#[derive(Clone)]
pub struct Backends {
    pub runtime: Arc<dyn ContainerRuntime>,
    pub channel: Arc<dyn BroadcastChannel>,
    pub config: Arc<BuildConfig>,
}
