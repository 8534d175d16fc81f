use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LogQueryError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    /// Query API plus the SSE tool transport.
    #[default]
    Http,
    /// Tool facade over stdin/stdout only.
    Stdio,
    Both,
}

impl ServerMode {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Some(ServerMode::Http),
            "stdio" => Some(ServerMode::Stdio),
            "both" => Some(ServerMode::Both),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub mode: ServerMode,
    #[serde(default)]
    pub http_addr: Option<String>,
    #[serde(default)]
    pub http_port: Option<u16>,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!(
            "{}:{}",
            self.http_addr.as_deref().unwrap_or("0.0.0.0"),
            self.http_port.unwrap_or(8081)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_demo_logs_path")]
    pub demo_logs_path: PathBuf,
    #[serde(default = "default_regions")]
    pub regions: Vec<String>,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            demo_logs_path: default_demo_logs_path(),
            regions: default_regions(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_log_server_url")]
    pub log_server_url: String,
    /// Leaving this unset disables `send_teams` only.
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            log_server_url: default_log_server_url(),
            webhook_url: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./logs.db")
}

fn default_demo_logs_path() -> PathBuf {
    PathBuf::from("../demo_logs")
}

fn default_regions() -> Vec<String> {
    vec!["NA".to_string(), "EU".to_string(), "AP".to_string()]
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_log_server_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Config {
    /// Load a YAML or JSON config file, picked by extension.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            LogQueryError::ConfigError(format!("read {} failed: {e}", path.display()))
        })?;
        let is_json = matches!(
            path.extension().and_then(|s| s.to_str()),
            Some(ext) if ext.eq_ignore_ascii_case("json")
        );
        if is_json {
            serde_json::from_str(&text).map_err(|e| {
                LogQueryError::ConfigError(format!("parse {} failed: {e}", path.display()))
            })
        } else {
            serde_yaml::from_str(&text).map_err(|e| {
                LogQueryError::ConfigError(format!("parse {} failed: {e}", path.display()))
            })
        }
    }

    /// Apply process environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Empty values are treated as unset.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("LOG_DB_PATH") {
            self.store.db_path = PathBuf::from(v);
        }
        if let Some(v) = get("DEMO_LOGS_PATH") {
            self.store.demo_logs_path = PathBuf::from(v);
        }
        if let Some(v) = get("LOG_SERVER_PORT") {
            let port = v.trim().parse::<u16>().map_err(|e| {
                LogQueryError::ConfigError(format!("LOG_SERVER_PORT={v}: {e}"))
            })?;
            self.server.http_port = Some(port);
        }
        if let Some(v) = get("LOG_SERVER_URL") {
            self.tools.log_server_url = v;
        }
        if let Some(v) = get("TEAMS_WEBHOOK_URL") {
            self.tools.webhook_url = Some(v);
        }
        if let Some(v) = get("LOG_SERVER_MODE") {
            self.server.mode = ServerMode::parse(&v)
                .ok_or_else(|| LogQueryError::ConfigError(format!("unknown LOG_SERVER_MODE: {v}")))?;
        }
        Ok(())
    }
}
