use crate::domain::dashboard::{DEFAULT_FROM_YEAR, DEFAULT_TO_YEAR, DateRange};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub dashboard: DashboardSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    /// Backend host, also the base for relative logo paths
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_context_path")]
    pub context_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Where the session keys live
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// Shared TOML file at `session.path`
    #[default]
    File,
    /// Process-local; nothing survives a restart
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    #[serde(default)]
    pub backend: SessionBackend,
    #[serde(default = "default_session_path")]
    pub path: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardSettings {
    #[serde(default = "default_from_year")]
    pub from_year: String,
    #[serde(default = "default_to_year")]
    pub to_year: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_base_url() -> String {
    "http://localhost:8085".to_string()
}

fn default_context_path() -> String {
    "/itelinc".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_session_path() -> String {
    "session/session.toml".to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_from_year() -> String {
    DEFAULT_FROM_YEAR.to_string()
}

fn default_to_year() -> String {
    DEFAULT_TO_YEAR.to_string()
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            context_path: default_context_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            backend: SessionBackend::default(),
            path: default_session_path(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            from_year: default_from_year(),
            to_year: default_to_year(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl SessionSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl DashboardSettings {
    pub fn date_range(&self) -> DateRange {
        DateRange::new(self.from_year.clone(), self.to_year.clone())
    }
}

/// `config/console.toml` if present, then `CONSOLE__SECTION__KEY` variables
pub fn load_console_config() -> anyhow::Result<ConsoleConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/console").required(false))
        .add_source(config::Environment::with_prefix("CONSOLE").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
