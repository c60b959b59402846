//! Runs a task's command under a wall-clock deadline.
//!
//! - [`command_line`]: shell-like tokenizing of the task's command line
//! - [`harvest`]: selection of result files after a run
//! - [`ProcessRunner`]: spawn, drain merged output, enforce the deadline

pub mod command_line;
pub mod harvest;
pub mod process_runner;

pub use command_line::tokenize;
pub use harvest::harvest_result_files;
pub use process_runner::{ProcessRunner, DRAIN_GRACE};
