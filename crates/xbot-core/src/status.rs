use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Externally visible agent state, as shown by presentation layers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    NotConfigured,
    Ready,
    Running,
    Error,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentStatus::NotConfigured => write!(f, "not_configured"),
            AgentStatus::Ready => write!(f, "ready"),
            AgentStatus::Running => write!(f, "running"),
            AgentStatus::Error => write!(f, "error"),
        }
    }
}

/// Receives status changes. Delivery is best-effort.
pub trait StatusReporter: Send + Sync {
    fn set_status(&self, status: AgentStatus, message: &str) -> Result<(), AgentError>;
}

/// Reporter that writes status changes to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl StatusReporter for TracingReporter {
    fn set_status(&self, status: AgentStatus, message: &str) -> Result<(), AgentError> {
        match status {
            AgentStatus::Error => warn!(%status, "{}", message),
            _ => info!(%status, "{}", message),
        }
        Ok(())
    }
}

/// Latest status plus fan-out to registered reporters.
#[derive(Clone)]
pub struct StatusBoard {
    tx: Arc<watch::Sender<(AgentStatus, String)>>,
    reporters: Vec<Arc<dyn StatusReporter>>,
}

impl StatusBoard {
    pub fn new(initial: AgentStatus) -> Self {
        let (tx, _rx) = watch::channel((initial, String::new()));
        Self {
            tx: Arc::new(tx),
            reporters: Vec::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn StatusReporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    /// Record a new status. Reporter failures are logged and dropped.
    pub fn set(&self, status: AgentStatus, message: impl Into<String>) {
        let message = message.into();
        for reporter in &self.reporters {
            if let Err(e) = reporter.set_status(status, &message) {
                debug!("Status reporter failed: {}", e);
            }
        }
        self.tx.send_replace((status, message));
    }

    pub fn current(&self) -> (AgentStatus, String) {
        self.tx.borrow().clone()
    }

    pub fn status(&self) -> AgentStatus {
        self.tx.borrow().0
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new(AgentStatus::NotConfigured)
    }
}
