use crate::document::parse_task_document;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, info};
use xbot_core::config::ClientSettings;
use xbot_core::error::AgentError;
use xbot_core::source::WorkSource;
use xbot_core::task::{Task, TaskResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Work source backed by the automated-tests HTTP API.
pub struct HttpWorkSource {
    settings: ClientSettings,
    base_url: String,
    http: reqwest::Client,
}

impl HttpWorkSource {
    pub fn new(settings: ClientSettings) -> Result<Self, AgentError> {
        let base_url = settings
            .server_url
            .trim_end_matches(['/', '\\'])
            .to_string();

        let mut builder = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .danger_accept_invalid_certs(settings.accept_invalid_certs);

        if let Some(proxy) = &settings.proxy {
            let mut p = reqwest::Proxy::all(format!("http://{}:{}", proxy.host, proxy.port))
                .map_err(http_error)?;
            if let Some(user) = proxy.user.as_deref().filter(|u| !u.is_empty()) {
                p = p.basic_auth(user, proxy.password.as_deref().unwrap_or(""));
            }
            builder = builder.proxy(p);
        }

        let http = builder.build().map_err(http_error)?;
        info!("Work source configured for {}", base_url);

        Ok(Self {
            settings,
            base_url,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, command: &str) -> String {
        format!("{}/api/automated_tests/{}.json", self.base_url, command)
    }

    /// Common query parameters and the signed authorization header.
    fn prepare(&self, request: RequestBuilder) -> RequestBuilder {
        let ts = chrono::Utc::now().timestamp_millis();
        request
            .query(&[
                ("client_id", self.settings.client_id.as_str()),
                ("xbot_version", AGENT_VERSION),
            ])
            .header(
                reqwest::header::AUTHORIZATION,
                authorization_header(&self.settings.api_key, &self.settings.api_secret, ts),
            )
    }
}

#[async_trait::async_trait]
impl WorkSource for HttpWorkSource {
    async fn fetch_next_task(&self) -> Result<Option<Task>, AgentError> {
        let url = self.endpoint("next_test");
        debug!("GET {}", url);

        let response = self
            .prepare(self.http.get(&url))
            .send()
            .await
            .map_err(http_error)?;
        let response = check_status(response).await?;

        let doc: serde_json::Value = response.json().await.map_err(http_error)?;
        Ok(parse_task_document(&doc))
    }

    async fn upload_result(&self, result: &TaskResult) -> Result<String, AgentError> {
        let url = self.endpoint("upload_test_result");
        let exit_code = result.exit_code.to_string();
        let destination = format!(
            "{}?instance_id={}&exit_code={}",
            url, result.instance_id, exit_code
        );
        debug!("POST {}", destination);

        // Output travels in the body, never in the query string.
        let mut form = Form::new().part("result", Part::text(result.output.clone()));
        for path in &result.files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let bytes = tokio::fs::read(path).await?;
            let part = Part::bytes(bytes).file_name(name.clone());
            form = form.part(format!("result_files[{}]", name), part);
        }

        let request = self
            .prepare(self.http.post(&url))
            .query(&[
                ("instance_id", result.instance_id.as_str()),
                ("exit_code", exit_code.as_str()),
            ])
            .multipart(form);

        let response = request.send().await.map_err(http_error)?;
        check_status(response).await?;
        Ok(destination)
    }
}

/// `Authorization` value: key, MD5 of key + secret + timestamp, timestamp.
pub fn authorization_header(api_key: &str, api_secret: &str, ts: i64) -> String {
    let digest = md5::compute(format!("{}{}{}", api_key, api_secret, ts));
    format!(
        "custom api_key={}, signature={:x}, ts={}",
        api_key, digest, ts
    )
}

async fn check_status(response: Response) -> Result<Response, AgentError> {
    match response.status() {
        StatusCode::OK => Ok(response),
        StatusCode::INTERNAL_SERVER_ERROR => {
            let body = response.text().await.unwrap_or_default();
            Err(AgentError::Api(format!(
                "Remote call Failed Error #500:{}",
                body
            )))
        }
        status => Err(AgentError::Protocol(format!(
            "{} returned {}",
            response.url(),
            status
        ))),
    }
}

fn http_error(e: reqwest::Error) -> AgentError {
    AgentError::Http(e.to_string())
}
