pub mod config;
pub mod error;
pub mod log;
pub mod runner;
pub mod source;
pub mod status;
pub mod task;

pub use config::Config;
pub use error::AgentError;
pub use log::BoundedLog;
pub use runner::TaskRunner;
pub use source::{ClientHolder, WorkSource};
pub use status::{AgentStatus, StatusBoard, StatusReporter};
pub use task::{ExecutionOutcome, Task, TaskResult};
