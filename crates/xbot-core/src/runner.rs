use crate::error::AgentError;
use crate::task::{ExecutionOutcome, Task};

/// Runs one task's command to completion or deadline.
///
/// Implementations must return an outcome for anything that happens after the
/// process was started; only a failure to start it is an error.
#[async_trait::async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run(&self, task: &Task) -> Result<ExecutionOutcome, AgentError>;
}
