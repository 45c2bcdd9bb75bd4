use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address to bind the server to
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origin allowed for cross-origin requests ("*" allows any)
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,

    /// Directory containing the static front-end
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// Milliseconds between position broadcasts
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,

    /// Per-request timeout for upstream API calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_allowed_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_update_interval_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origin: default_allowed_origin(),
            static_dir: default_static_dir(),
            update_interval_ms: default_update_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// A missing file falls back to defaults since every field has one;
    /// a file that exists but does not parse is a startup error.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file '{}'", path))?;
        let config: Config = toml::from_str(&content)
            .context(format!("Failed to parse config file '{}'", path))?;

        Ok(config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
