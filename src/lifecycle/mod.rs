//! Process lifecycle: the task group, periodic tasks, the pipeline
//! orchestrator and tracing setup.

pub mod periodic;
pub mod pipeline;
pub mod tasks;
pub mod tracing;

pub use self::tracing::setup_tracing;
pub use periodic::run_periodic;
pub use pipeline::Pipeline;
pub use tasks::TaskGroup;
