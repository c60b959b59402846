use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "xbot")]
#[command(about = "Polls a test queue and runs automated tests", long_about = None)]
struct Cli {
    /// Settings file (defaults to ~/.config/xbot/xbot.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent until interrupted
    Run,

    /// Run a single command the way a queued task would be run
    Exec {
        /// Command line: program followed by arguments
        command_line: String,

        /// Result file or directory to collect afterwards
        #[arg(short, long, default_value = "")]
        results: PathBuf,

        /// Maximum number of result files to collect from a directory
        #[arg(short, long, default_value = "10")]
        max_files: usize,

        /// Seconds before the command is killed
        #[arg(short, long, default_value = "60")]
        timeout: u64,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show or create the settings file
    Config {
        /// Print the settings file path only
        #[arg(long)]
        path: bool,

        /// Write a sample settings file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `exec --json` output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("XBOT_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli
        .config
        .unwrap_or_else(xbot_core::Config::default_path);

    match cli.command {
        Commands::Run => commands::run::run(&config_path).await?,
        Commands::Exec {
            command_line,
            results,
            max_files,
            timeout,
            json,
        } => commands::exec::run(command_line, results, max_files, timeout, json).await?,
        Commands::Config { path, init } => commands::config::run(&config_path, path, init)?,
    }

    Ok(())
}
