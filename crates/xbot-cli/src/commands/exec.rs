use std::path::PathBuf;
use xbot_core::runner::TaskRunner;
use xbot_core::task::Task;
use xbot_runner::ProcessRunner;

pub async fn run(
    command_line: String,
    results: PathBuf,
    max_files: usize,
    timeout: u64,
    json: bool,
) -> anyhow::Result<()> {
    let task = Task {
        instance_id: "local".to_string(),
        description: "local run".to_string(),
        command_line,
        results_path: results,
        max_result_files: max_files,
        timeout_secs: timeout,
    };

    let outcome = ProcessRunner::new().run(&task).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if outcome.timed_out {
        println!("Timed out after {}s", task.timeout_secs);
    } else {
        println!("Exit code: {}", outcome.exit_code);
    }
    if outcome.result_files.is_empty() {
        println!("Result files: none");
    } else {
        println!("Result files:");
        for file in &outcome.result_files {
            println!("  - {}", file.display());
        }
    }
    println!("Output:");
    print!("{}", outcome.output);

    Ok(())
}
