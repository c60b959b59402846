use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Failed to launch [{command}]: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid command line: {0:?}")]
    InvalidCommand(String),

    #[error("Remote call failed: {0}")]
    Protocol(String),

    #[error("{0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Task worker failed: {0}")]
    Worker(String),

    #[error("Status notification failed: {0}")]
    Status(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl AgentError {
    /// Prefix used when the scheduler reports this error in the agent log.
    pub fn log_prefix(&self) -> &'static str {
        match self {
            AgentError::Protocol(_)
            | AgentError::Http(_)
            | AgentError::Io(_)
            | AgentError::Json(_) => "Error occurred during communication with server: ",
            AgentError::Api(_) => "APIException: ",
            _ => "Unhandled exception: ",
        }
    }
}
