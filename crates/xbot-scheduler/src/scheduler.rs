use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use xbot_core::error::AgentError;
use xbot_core::log::{BoundedLog, LogEntry};
use xbot_core::runner::TaskRunner;
use xbot_core::source::{ClientHolder, WorkSource};
use xbot_core::status::{AgentStatus, StatusBoard};
use xbot_core::task::TaskResult;

/// Task output is cut to this many characters in the agent log.
pub const OUTPUT_DISPLAY_LEN: usize = 255;

/// Pulls tasks from the configured work source and runs them one at a time.
pub struct Scheduler {
    client: ClientHolder,
    runner: Arc<dyn TaskRunner>,
    log: Arc<BoundedLog>,
    status: StatusBoard,
}

/// Running scheduler loop, returned by [`Scheduler::start`].
pub struct SchedulerHandle {
    stop: CancellationToken,
    join: JoinHandle<()>,
}

impl Scheduler {
    pub fn new(
        client: ClientHolder,
        runner: Arc<dyn TaskRunner>,
        log: Arc<BoundedLog>,
        status: StatusBoard,
    ) -> Self {
        if client.is_configured() {
            status.set(AgentStatus::Ready, "xbot is ready");
        } else {
            status.set(AgentStatus::NotConfigured, "xbot is not configured");
        }
        Self {
            client,
            runner,
            log,
            status,
        }
    }

    pub fn log_snapshot(&self) -> Vec<LogEntry> {
        self.log.snapshot()
    }

    pub fn status(&self) -> (AgentStatus, String) {
        self.status.current()
    }

    /// Swap the work source. A tick already in progress keeps the old one.
    pub fn reconfigure(&self, source: Option<Arc<dyn WorkSource>>) {
        let configured = source.is_some();
        self.client.replace(source);
        if configured {
            self.status.set(AgentStatus::Ready, "xbot is ready");
        } else {
            self.status
                .set(AgentStatus::NotConfigured, "xbot is not configured");
        }
    }

    /// Run one tick to completion. Returns the number of tasks completed.
    pub async fn tick(&self) -> usize {
        self.tick_until(&CancellationToken::new()).await
    }

    async fn tick_until(&self, stop: &CancellationToken) -> usize {
        self.log.append("Scheduler is awake, getting next task to run");

        let Some(source) = self.client.current() else {
            warn!("Work source is not yet configured");
            self.log.append("Work source is not yet configured");
            self.status
                .set(AgentStatus::NotConfigured, "xbot is not configured");
            return 0;
        };

        let mut completed = 0;
        while !stop.is_cancelled() {
            match self.run_next(source.as_ref(), stop).await {
                Ok(true) => completed += 1,
                Ok(false) => break,
                Err(e) => {
                    self.report_error(&e);
                    break;
                }
            }
        }

        self.log.append("Scheduler finished, going to sleep.");
        completed
    }

    /// Fetch, run and upload one task. `Ok(false)` when there was nothing to run.
    async fn run_next(
        &self,
        source: &dyn WorkSource,
        stop: &CancellationToken,
    ) -> Result<bool, AgentError> {
        let Some(task) = source.fetch_next_task().await? else {
            self.log.append("There is no task to run in the queue");
            self.status.set(AgentStatus::Ready, "xbot is ready");
            return Ok(false);
        };

        if stop.is_cancelled() {
            warn!(task = %task, "Stop requested, not starting fetched task");
            self.log
                .append(format!("Stop requested, task [{}] was not run", task.label()));
            return Ok(false);
        }

        let label = task.label();
        self.log.append(format!("Running {}", label));
        self.status
            .set(AgentStatus::Running, format!("xbot is running: {}", label));

        // Separate worker, so this loop is never the one parked on process I/O.
        let runner = Arc::clone(&self.runner);
        let worker_task = task.clone();
        let outcome = tokio::spawn(async move { runner.run(&worker_task).await })
            .await
            .map_err(|e| AgentError::Worker(e.to_string()))??;

        if outcome.timed_out {
            self.log.append(format!("Task [{}] timed out", label));
        } else {
            self.log.append(format!(
                "Task [{}] finished with exit code {}",
                label, outcome.exit_code
            ));
        }

        let result = TaskResult::new(&task, outcome);
        self.log.append(format!(
            "Task [{}] output: [{}]",
            label,
            result.display_output(OUTPUT_DISPLAY_LEN)
        ));
        self.log.append(format!(
            "Uploading test results...{}",
            describe_files(&result)
        ));

        let destination = source.upload_result(&result).await?;
        self.log
            .append(format!("Finished uploading test results [{}].", destination));
        self.status.set(
            AgentStatus::Ready,
            "xbot finished running task, ready for the next one",
        );
        Ok(true)
    }

    fn report_error(&self, e: &AgentError) {
        let message = format!("{}{}", e.log_prefix(), e);
        error!("{}", message);
        self.log.append(message);
        self.status
            .set(AgentStatus::Error, format!("xbot failed to run task: {}", e));
    }

    /// Spawn the recurring loop: first tick after `initial_delay`, then one tick
    /// `poll_delay` after the previous one finished.
    pub fn start(self: Arc<Self>, poll_delay: Duration, initial_delay: Duration) -> SchedulerHandle {
        let stop = CancellationToken::new();
        let token = stop.clone();

        let join = tokio::spawn(async move {
            info!(?poll_delay, ?initial_delay, "Scheduler started");
            let mut delay = initial_delay;
            while sleep_unless_stopped(&token, delay).await {
                self.tick_until(&token).await;
                delay = poll_delay;
            }
            info!("Scheduler stopped");
        });

        SchedulerHandle { stop, join }
    }
}

impl SchedulerHandle {
    /// Stop the loop. A task already running finishes (and is uploaded)
    /// first; no further task is started.
    pub async fn stop(self) -> Result<(), AgentError> {
        self.stop.cancel();
        self.join
            .await
            .map_err(|e| AgentError::Worker(e.to_string()))
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Returns false if stop was requested before the delay elapsed.
async fn sleep_unless_stopped(stop: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = stop.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

fn describe_files(result: &TaskResult) -> String {
    if result.files.is_empty() {
        return "[no result files]".to_string();
    }
    let names: Vec<String> = result
        .files
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    format!("[{}]", names.join(", "))
}
