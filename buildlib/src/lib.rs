mod actors;
pub mod broadcast;
pub mod config;
mod dispatcher;
pub mod errors;
pub mod events;
pub mod instruction;
mod relay;
pub mod runtime;
#[cfg(test)]
mod testing;
pub mod types;

// re-export the job coord handle as if it is the job coordinator itself.
pub use actors::coordinator::JobCoordinatorHandle as JobCoordinator;
pub use actors::coordinator::StopReceipt;
pub use dispatcher::Dispatcher;
pub use events::{JobState, Outcome};
