use serde_json::Value;
use std::path::PathBuf;
use xbot_core::task::Task;

/// Build a task from a `next_test` response body.
///
/// The server signals an empty queue by leaving out the `instance` object.
/// Missing fields fall back to empty strings and zeroes.
pub fn parse_task_document(doc: &Value) -> Option<Task> {
    let instance = doc.get("instance").filter(|v| !v.is_null())?;
    let test = &doc["test"];

    Some(Task {
        instance_id: text(&instance["id"]),
        description: format!(
            "Test id:{} Suite:{}",
            text(&test["id"]),
            text(&doc["testSet"]["name"])
        ),
        command_line: text(&test["path_to_application"]),
        results_path: PathBuf::from(text(&test["path_to_results"])),
        max_result_files: number(&test["num_of_files_to_upload"]).max(0) as usize,
        timeout_secs: number(&instance["timeout_in_seconds"]).max(0) as u64,
    })
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn number(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
