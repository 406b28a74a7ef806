use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub const CONFIG_VERSION: u32 = 1;
pub const MAX_LOG_LEVEL: u8 = 4;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(alias = "ConfigVer")]
    pub config_version: u32,
    #[serde(alias = "CollectorAddr")]
    pub collector_addr: String,
    #[serde(alias = "LogLevel", default = "default_log_level")]
    pub log_level: u8,
    #[serde(alias = "Adapter")]
    pub adapter: String,
    #[serde(alias = "AuthKey")]
    pub auth_key: String,
    #[serde(default)]
    pub status_listen: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Config {
    /// Loads and validates the agent config. JSON files are accepted as well,
    /// since every JSON document is valid YAML.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.config_version != CONFIG_VERSION {
            return Err(ConfigError::Validation(format!(
                "config_version {} is not supported, expected {}",
                self.config_version, CONFIG_VERSION
            )));
        }
        if self.log_level > MAX_LOG_LEVEL {
            return Err(ConfigError::Validation(format!(
                "log_level must be in range 0..={MAX_LOG_LEVEL}"
            )));
        }
        if self.adapter.trim().is_empty() {
            return Err(ConfigError::Validation(
                "adapter must not be empty".to_string(),
            ));
        }
        // collector_addr is checked by the reporter when it opens its socket;
        // a bad address only disables reporting.
        if let Some(listen) = &self.status_listen {
            if SocketAddr::from_str(listen).is_err() {
                return Err(ConfigError::Validation(
                    "status_listen must be a valid host:port address".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Default tracing filter directive for the configured `log_level`.
    ///
    /// SEVERE keeps only the reporter's errors, the ones that stop a unit.
    pub fn log_filter(&self) -> &'static str {
        match self.log_level {
            0 => "debug",
            1 => "info",
            2 => "warn",
            3 => "error",
            _ => SEVERE_FILTER,
        }
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

const SEVERE_FILTER: &str = "varanus::reporter=error";

const fn default_log_level() -> u8 {
    1
}
