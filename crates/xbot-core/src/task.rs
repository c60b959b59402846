use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Exit code recorded when the process never completed normally.
pub const NO_EXIT_CODE: i32 = -1;

/// One unit of work handed out by the work source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    /// Opaque identifier echoed back to the server on upload.
    pub instance_id: String,
    pub description: String,
    /// Program and arguments, tokenized with shell-like quoting.
    pub command_line: String,
    /// A single result file or a directory of result files.
    pub results_path: PathBuf,
    pub max_result_files: usize,
    pub timeout_secs: u64,
}

impl Task {
    /// Display label used in log lines and status messages.
    pub fn label(&self) -> String {
        format!("{} [{}]", self.description, self.command_line)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.instance_id)
    }
}

/// What happened when a task's command was run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub exit_code: i32,
    pub timed_out: bool,
    /// Combined stdout and stderr, one `\n`-terminated line per line read.
    pub output: String,
    /// Oldest-modified first.
    pub result_files: Vec<PathBuf>,
}

impl ExecutionOutcome {
    pub fn completed(exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Self::default()
        }
    }

    pub fn timed_out() -> Self {
        Self {
            exit_code: NO_EXIT_CODE,
            timed_out: true,
            ..Self::default()
        }
    }
}

/// Payload uploaded to the work source once a task has run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskResult {
    pub instance_id: String,
    pub exit_code: i32,
    pub files: Vec<PathBuf>,
    pub output: String,
}

impl TaskResult {
    pub fn new(task: &Task, outcome: ExecutionOutcome) -> Self {
        Self {
            instance_id: task.instance_id.clone(),
            exit_code: outcome.exit_code,
            files: outcome.result_files,
            output: outcome.output,
        }
    }

    /// Output shortened to at most `max_len` characters, for log display only.
    pub fn display_output(&self, max_len: usize) -> String {
        if self.output.chars().count() <= max_len {
            return self.output.clone();
        }
        let keep = max_len.saturating_sub(6);
        let mut shortened: String = self.output.chars().take(keep).collect();
        shortened.push_str("<...>");
        shortened
    }
}
