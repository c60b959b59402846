use axum::extract::{Multipart, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use xbot_core::config::ClientSettings;
use xbot_core::error::AgentError;
use xbot_core::source::WorkSource;
use xbot_core::task::TaskResult;
use xbot_remote::{authorization_header, parse_task_document, HttpWorkSource};

#[derive(Default)]
struct Seen {
    queries: Vec<HashMap<String, String>>,
    authorization: Vec<String>,
    uploaded_parts: Vec<(String, Vec<u8>)>,
}

type Shared = Arc<Mutex<Seen>>;

async fn next_test(
    State(seen): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    let mut seen = seen.lock().unwrap();
    seen.queries.push(query);
    if let Some(auth) = headers.get("authorization") {
        seen.authorization.push(auth.to_str().unwrap().to_string());
    }
    Json(json!({
        "instance": { "id": 991, "timeout_in_seconds": 120 },
        "test": {
            "id": 17,
            "path_to_application": "/opt/tests/run.sh --suite smoke",
            "path_to_results": "/opt/tests/results",
            "num_of_files_to_upload": 4
        },
        "testSet": { "name": "Nightly" }
    }))
}

async fn upload(
    State(seen): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    mut multipart: Multipart,
) -> StatusCode {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.unwrap().to_vec();
        parts.push((name, bytes));
    }
    let mut seen = seen.lock().unwrap();
    seen.queries.push(query);
    seen.uploaded_parts.extend(parts);
    StatusCode::OK
}

async fn rejected() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "invalid api token")
}

async fn unavailable() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/", addr)
}

fn settings(server_url: String) -> ClientSettings {
    ClientSettings {
        server_url,
        api_key: "key".to_string(),
        api_secret: "secret".to_string(),
        client_id: "agent-7".to_string(),
        proxy: None,
        accept_invalid_certs: false,
    }
}

#[test]
fn test_parse_task_document() {
    let doc = json!({
        "instance": { "id": "abc", "timeout_in_seconds": "30" },
        "test": { "id": 5, "path_to_application": "run.sh", "path_to_results": "out", "num_of_files_to_upload": 2 },
        "testSet": { "name": "Suite A" }
    });
    let task = parse_task_document(&doc).unwrap();
    assert_eq!(task.instance_id, "abc");
    assert_eq!(task.description, "Test id:5 Suite:Suite A");
    assert_eq!(task.command_line, "run.sh");
    assert_eq!(task.results_path, PathBuf::from("out"));
    assert_eq!(task.max_result_files, 2);
    assert_eq!(task.timeout_secs, 30);
}

#[test]
fn test_missing_instance_means_empty_queue() {
    assert!(parse_task_document(&json!({ "test": { "id": 1 } })).is_none());
    assert!(parse_task_document(&json!({ "instance": null })).is_none());
}

#[test]
fn test_negative_file_count_is_clamped() {
    let doc = json!({ "instance": { "id": 1 }, "test": { "num_of_files_to_upload": -3 } });
    assert_eq!(parse_task_document(&doc).unwrap().max_result_files, 0);
}

#[test]
fn test_authorization_header_format() {
    let header = authorization_header("key", "secret", 1_700_000_000_000);
    let expected = format!("{:x}", md5::compute("keysecret1700000000000"));
    assert_eq!(
        header,
        format!("custom api_key=key, signature={}, ts=1700000000000", expected)
    );
    assert_eq!(expected.len(), 32);
}

#[tokio::test]
async fn test_trailing_separator_is_stripped() {
    let source = HttpWorkSource::new(settings("https://example.test//".to_string())).unwrap();
    assert_eq!(source.base_url(), "https://example.test");
}

#[tokio::test]
async fn test_fetch_next_task_over_http() {
    let seen: Shared = Arc::default();
    let app = Router::new()
        .route("/api/automated_tests/next_test.json", get(next_test))
        .with_state(Arc::clone(&seen));
    let source = HttpWorkSource::new(settings(spawn_server(app).await)).unwrap();

    let task = source.fetch_next_task().await.unwrap().expect("task queued");
    assert_eq!(task.instance_id, "991");
    assert_eq!(task.description, "Test id:17 Suite:Nightly");
    assert_eq!(task.timeout_secs, 120);
    assert_eq!(task.max_result_files, 4);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.queries[0]["client_id"], "agent-7");
    assert!(seen.queries[0].contains_key("xbot_version"));
    assert!(seen.authorization[0].starts_with("custom api_key=key, signature="));
}

#[tokio::test]
async fn test_upload_result_sends_output_and_files() {
    let seen: Shared = Arc::default();
    let app = Router::new()
        .route("/api/automated_tests/upload_test_result.json", post(upload))
        .with_state(Arc::clone(&seen));
    let source = HttpWorkSource::new(settings(spawn_server(app).await)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("report.xml");
    std::fs::write(&report, "<ok/>").unwrap();

    let output = "line one\nline two & more\n".to_string();
    let destination = source
        .upload_result(&TaskResult {
            instance_id: "991".to_string(),
            exit_code: 3,
            files: vec![report],
            output: output.clone(),
        })
        .await
        .unwrap();

    assert!(destination.contains("upload_test_result.json?instance_id=991&exit_code=3"));
    let seen = seen.lock().unwrap();
    assert_eq!(seen.queries[0]["exit_code"], "3");
    assert!(!seen.queries[0].contains_key("result"));
    assert_eq!(
        seen.uploaded_parts,
        vec![
            ("result".to_string(), output.into_bytes()),
            ("result_files[report.xml]".to_string(), b"<ok/>".to_vec()),
        ]
    );
}

#[tokio::test]
async fn test_large_output_is_uploaded_in_body() {
    let seen: Shared = Arc::default();
    let app = Router::new()
        .route("/api/automated_tests/upload_test_result.json", post(upload))
        .with_state(Arc::clone(&seen));
    let source = HttpWorkSource::new(settings(spawn_server(app).await)).unwrap();

    let output = "x".repeat(200_000);
    source
        .upload_result(&TaskResult {
            instance_id: "992".to_string(),
            exit_code: 0,
            files: Vec::new(),
            output: output.clone(),
        })
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.queries[0]["instance_id"], "992");
    assert_eq!(
        seen.uploaded_parts,
        vec![("result".to_string(), output.into_bytes())]
    );
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let app = Router::new().route("/api/automated_tests/next_test.json", get(rejected));
    let source = HttpWorkSource::new(settings(spawn_server(app).await)).unwrap();

    let err = source.fetch_next_task().await.unwrap_err();
    match err {
        AgentError::Api(message) => assert!(message.contains("invalid api token")),
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_other_status_is_protocol_error() {
    let app = Router::new().route("/api/automated_tests/next_test.json", get(unavailable));
    let source = HttpWorkSource::new(settings(spawn_server(app).await)).unwrap();

    let err = source.fetch_next_task().await.unwrap_err();
    assert!(matches!(err, AgentError::Protocol(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_http_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let source = HttpWorkSource::new(settings(url)).unwrap();

    let err = source.fetch_next_task().await.unwrap_err();
    assert!(matches!(err, AgentError::Http(_)));
}
