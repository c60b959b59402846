use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

pub const DEFAULT_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} :: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.message
        )
    }
}

/// Fixed-capacity agent log, most recent entry first.
///
/// Shared between the scheduler loop and the task worker; readers only ever
/// get a copy of the entries.
#[derive(Debug)]
pub struct BoundedLog {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl BoundedLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record a message, evicting the oldest entry once over capacity.
    pub fn append(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(target: "xbot::log", "{}", message);

        let mut entries = self.lock();
        entries.push_front(LogEntry {
            timestamp: Local::now(),
            message,
        });
        entries.truncate(self.capacity);
    }

    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        // A panic while holding the lock cannot leave the deque half-updated.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for BoundedLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
