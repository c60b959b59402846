use crate::command_line::{resolve_program, tokenize, working_dir};
use crate::harvest::harvest_result_files;
use std::io::PipeReader;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use xbot_core::error::AgentError;
use xbot_core::log::BoundedLog;
use xbot_core::runner::TaskRunner;
use xbot_core::task::{ExecutionOutcome, Task, NO_EXIT_CODE};

/// How long to keep draining output after the process has finished.
///
/// A killed process can leave descendants holding the pipes open; past this
/// point the drainer is stopped and keeps what it has read.
pub const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Runs a task's command with a hard deadline, capturing merged output and
/// result files.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    log: Option<Arc<BoundedLog>>,
    drain_grace: Duration,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self {
            log: None,
            drain_grace: DRAIN_GRACE,
        }
    }

    /// Mirror progress messages into the agent log.
    pub fn with_log(mut self, log: Arc<BoundedLog>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    fn note(&self, message: String) {
        match &self.log {
            Some(log) => log.append(message),
            None => info!("{}", message),
        }
    }

    /// Fixes the outcome once the deadline has fired.
    ///
    /// Only this task touches the child handle, so checking for a natural exit
    /// and killing happen as one step with respect to the outcome.
    async fn terminate(&self, child: &mut Child, task: &Task) -> ExecutionOutcome {
        if let Ok(Some(status)) = child.try_wait() {
            debug!(task = %task, "Process exited just as the deadline fired");
            return ExecutionOutcome::completed(exit_code_of(status));
        }

        self.note(format!("Timeout expired for [{}]", task.description));
        kill_process_group(child.id());
        if let Err(e) = child.start_kill() {
            debug!(task = %task, "Kill after deadline: {}", e);
        }
        if let Err(e) = child.wait().await {
            warn!(task = %task, "Failed to reap killed process: {}", e);
        }
        ExecutionOutcome::timed_out()
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TaskRunner for ProcessRunner {
    async fn run(&self, task: &Task) -> Result<ExecutionOutcome, AgentError> {
        let tokens = tokenize(&task.command_line);
        let Some(first) = tokens.first() else {
            return Err(AgentError::InvalidCommand(task.command_line.clone()));
        };

        let program = resolve_program(first);
        self.note(format!("Running command {:?}", tokens));

        // One pipe behind both streams keeps lines in the order they were written.
        let launch_error = |source| AgentError::Launch {
            command: task.command_line.clone(),
            source,
        };
        let (reader, writer) = std::io::pipe().map_err(launch_error)?;
        let err_writer = writer.try_clone().map_err(launch_error)?;

        let mut cmd = Command::new(&program);
        cmd.args(&tokens[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::from(writer))
            .stderr(Stdio::from(err_writer))
            .kill_on_drop(true);
        if let Some(dir) = working_dir(&program) {
            debug!("Working directory: [{}]", dir.display());
            cmd.current_dir(dir);
        }
        // Own process group, so the deadline kill reaches grandchildren too.
        #[cfg(unix)]
        cmd.process_group(0);

        let spawned = cmd.spawn();
        // Our copies of the write end must close, or the drainer never sees EOF.
        drop(cmd);
        let mut child = spawned.map_err(launch_error)?;
        info!(task = %task, pid = ?child.id(), timeout_secs = task.timeout_secs, "Process started");

        let stop_drain = CancellationToken::new();
        let drainer = match output_stream(reader) {
            Ok(stream) => tokio::spawn(drain(stream, stop_drain.clone())),
            Err(e) => {
                warn!(task = %task, "Cannot read process output: {}", e);
                tokio::spawn(async { String::new() })
            }
        };

        let deadline = CancellationToken::new();
        let watcher = tokio::spawn(watch_deadline(
            Duration::from_secs(task.timeout_secs),
            deadline.clone(),
        ));

        let mut outcome = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => ExecutionOutcome::completed(exit_code_of(status)),
                Err(e) => {
                    warn!(task = %task, "Failed waiting for process: {}", e);
                    ExecutionOutcome::completed(NO_EXIT_CODE)
                }
            },
            _ = deadline.cancelled() => self.terminate(&mut child, task).await,
        };
        // Outcome is fixed; a late watcher firing now has nothing to act on.
        watcher.abort();

        outcome.output = collect_output(drainer, stop_drain, self.drain_grace).await;
        outcome.result_files =
            harvest_result_files(&task.results_path, task.max_result_files).await;

        info!(
            task = %task,
            exit_code = outcome.exit_code,
            timed_out = outcome.timed_out,
            result_files = outcome.result_files.len(),
            "Process finished"
        );
        Ok(outcome)
    }
}

fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(NO_EXIT_CODE)
}

async fn watch_deadline(timeout: Duration, deadline: CancellationToken) {
    tokio::time::sleep(timeout).await;
    debug!("Deadline reached after {:?}", timeout);
    deadline.cancel();
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    // SAFETY: kill(2) takes plain integers; the child leads group `pid`.
    let rc = unsafe { libc::kill(-pid, libc::SIGKILL) };
    if rc != 0 {
        debug!(
            "Process group {} kill failed: {}",
            pid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

#[cfg(unix)]
fn output_stream(reader: PipeReader) -> std::io::Result<Box<dyn AsyncRead + Send + Unpin>> {
    let fd = std::os::fd::OwnedFd::from(reader);
    Ok(Box::new(tokio::net::unix::pipe::Receiver::from_owned_fd(fd)?))
}

#[cfg(not(unix))]
fn output_stream(reader: PipeReader) -> std::io::Result<Box<dyn AsyncRead + Send + Unpin>> {
    let handle = std::os::windows::io::OwnedHandle::from(reader);
    let file = std::fs::File::from(handle);
    Ok(Box::new(tokio::fs::File::from_std(file)))
}

/// Reads the merged console stream into one buffer until it closes or
/// `stop` fires. The buffer is only handed out when the task is joined.
async fn drain(stream: Box<dyn AsyncRead + Send + Unpin>, stop: CancellationToken) -> String {
    let mut output = String::new();
    let mut lines = BufReader::new(stream).split(b'\n');

    loop {
        let segment = tokio::select! {
            _ = stop.cancelled() => break,
            segment = lines.next_segment() => segment,
        };

        match segment {
            Ok(Some(bytes)) => {
                let line = String::from_utf8_lossy(&bytes);
                output.push_str(line.strip_suffix('\r').unwrap_or(&*line));
                output.push('\n');
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read process console stream: {}", e);
                break;
            }
        }
    }

    output
}

async fn collect_output(
    mut drainer: JoinHandle<String>,
    stop: CancellationToken,
    grace: Duration,
) -> String {
    let joined = match tokio::time::timeout(grace, &mut drainer).await {
        Ok(joined) => joined,
        Err(_) => {
            debug!("Output still open {:?} after exit, stopping drainer", grace);
            stop.cancel();
            drainer.await
        }
    };
    joined.unwrap_or_else(|e| {
        warn!("Output drainer failed: {}", e);
        String::new()
    })
}
