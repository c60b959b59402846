use crate::error::AgentError;
use crate::task::{Task, TaskResult};
use std::sync::Arc;
use tokio::sync::watch;

/// Remote queue the agent pulls tasks from and reports results to.
#[async_trait::async_trait]
pub trait WorkSource: Send + Sync {
    /// Next queued task, or `None` when the queue is empty.
    async fn fetch_next_task(&self) -> Result<Option<Task>, AgentError>;

    /// Upload a finished task's result. Returns where it was sent.
    async fn upload_result(&self, result: &TaskResult) -> Result<String, AgentError>;
}

/// Holds the currently configured work source.
///
/// Reconfiguration swaps the whole source at once; callers keep the snapshot
/// they took, so a task in flight finishes against the source it started with.
#[derive(Clone)]
pub struct ClientHolder {
    tx: Arc<watch::Sender<Option<Arc<dyn WorkSource>>>>,
}

impl ClientHolder {
    pub fn new(source: Option<Arc<dyn WorkSource>>) -> Self {
        let (tx, _rx) = watch::channel(source);
        Self { tx: Arc::new(tx) }
    }

    pub fn empty() -> Self {
        Self::new(None)
    }

    pub fn current(&self) -> Option<Arc<dyn WorkSource>> {
        self.tx.borrow().clone()
    }

    pub fn replace(&self, source: Option<Arc<dyn WorkSource>>) {
        self.tx.send_replace(source);
    }

    pub fn is_configured(&self) -> bool {
        self.tx.borrow().is_some()
    }
}

impl Default for ClientHolder {
    fn default() -> Self {
        Self::empty()
    }
}
