use crate::error::AgentError;
use crate::log::DEFAULT_LOG_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "https://api.practitest.com";

/// Top-level agent settings.
/// Loaded from ~/.config/xbot/xbot.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_server_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerConfig {
    #[serde(default = "default_poll_delay_secs")]
    pub poll_delay_secs: u64,
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

/// Everything needed to build a work-source client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub client_id: String,
    pub proxy: Option<ProxyConfig>,
    pub accept_invalid_certs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            api_key: String::new(),
            api_secret: String::new(),
            client_id: String::new(),
            proxy: None,
            accept_invalid_certs: false,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_delay_secs: default_poll_delay_secs(),
            initial_delay_secs: default_initial_delay_secs(),
            log_capacity: default_log_capacity(),
        }
    }
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_poll_delay_secs() -> u64 {
    60
}

fn default_initial_delay_secs() -> u64 {
    3
}

fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

impl Config {
    /// Load config from the default path, or defaults if it does not exist.
    pub fn load_default() -> Result<Self, AgentError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, AgentError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;
        if config.server.url.trim().is_empty() {
            config.server.url = default_server_url();
        }
        Ok(config)
    }

    /// Overwrite the settings file at `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), AgentError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("xbot")
            .join("xbot.yaml")
    }

    /// Client settings, if enough is configured to talk to the server.
    pub fn client_settings(&self) -> Option<ClientSettings> {
        let server = &self.server;
        if server.url.trim().is_empty()
            || server.api_key.trim().is_empty()
            || server.client_id.trim().is_empty()
        {
            return None;
        }
        Some(ClientSettings {
            server_url: server.url.trim().to_string(),
            api_key: server.api_key.trim().to_string(),
            api_secret: server.api_secret.trim().to_string(),
            client_id: server.client_id.trim().to_string(),
            proxy: server.proxy.clone(),
            accept_invalid_certs: server.accept_invalid_certs,
        })
    }
}

impl SchedulerConfig {
    pub fn poll_delay(&self) -> Duration {
        Duration::from_secs(self.poll_delay_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }
}
