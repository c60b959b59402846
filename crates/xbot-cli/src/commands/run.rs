use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use xbot_core::config::Config;
use xbot_core::log::BoundedLog;
use xbot_core::source::{ClientHolder, WorkSource};
use xbot_core::status::{AgentStatus, StatusBoard, TracingReporter};
use xbot_remote::HttpWorkSource;
use xbot_runner::ProcessRunner;
use xbot_scheduler::Scheduler;

pub async fn run(config_path: &Path) -> anyhow::Result<()> {
    let config = if config_path.exists() {
        Config::load_from(config_path)?
    } else {
        warn!("No settings at {}, using defaults", config_path.display());
        Config::default()
    };

    let log = Arc::new(BoundedLog::new(config.scheduler.log_capacity));
    log.append(format!("Running version {}", env!("CARGO_PKG_VERSION")));
    log.append(format!("Loading with server URL: {}", config.server.url));

    let client = ClientHolder::new(build_source(&config));
    let runner = Arc::new(ProcessRunner::new().with_log(Arc::clone(&log)));
    let status = StatusBoard::new(AgentStatus::NotConfigured).with_reporter(Arc::new(TracingReporter));

    let scheduler = Arc::new(Scheduler::new(client, runner, log, status));
    let handle = Arc::clone(&scheduler).start(
        config.scheduler.poll_delay(),
        config.scheduler.initial_delay(),
    );

    tokio::signal::ctrl_c().await?;
    info!("Interrupted, waiting for the current task to finish...");
    handle.stop().await?;

    let (status, message) = scheduler.status();
    info!(%status, "Stopped: {}", message);
    Ok(())
}

fn build_source(config: &Config) -> Option<Arc<dyn WorkSource>> {
    let settings = config.client_settings()?;
    match HttpWorkSource::new(settings) {
        Ok(source) => Some(Arc::new(source)),
        Err(e) => {
            error!("Failed to create work source client: {}", e);
            None
        }
    }
}
