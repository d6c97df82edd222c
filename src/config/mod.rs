//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::calculate::NetResultPolicy;
use crate::parse_duration;
use crate::report::ReportSettings;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Report composition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// Leaderboard entries in daily reports
    #[serde(default = "default_daily_leaderboard_size")]
    pub daily_leaderboard_size: usize,

    /// Leaderboard entries in monthly reports
    #[serde(default = "default_monthly_leaderboard_size")]
    pub monthly_leaderboard_size: usize,

    #[serde(default = "default_max_concurrent_days")]
    pub max_concurrent_days: usize,

    /// Deadline for one report request, e.g. "30s" or "2m"
    #[serde(default = "default_report_timeout")]
    pub report_timeout: String,

    #[serde(default)]
    pub net_result_policy: NetResultPolicy,
}

fn default_daily_leaderboard_size() -> usize {
    5
}

fn default_monthly_leaderboard_size() -> usize {
    10
}

fn default_max_concurrent_days() -> usize {
    8
}

fn default_report_timeout() -> String {
    "30s".to_string()
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            daily_leaderboard_size: default_daily_leaderboard_size(),
            monthly_leaderboard_size: default_monthly_leaderboard_size(),
            max_concurrent_days: default_max_concurrent_days(),
            report_timeout: default_report_timeout(),
            net_result_policy: NetResultPolicy::default(),
        }
    }
}

impl ReportsConfig {
    pub fn settings(&self) -> ReportSettings {
        ReportSettings {
            daily_leaderboard_size: self.daily_leaderboard_size,
            monthly_leaderboard_size: self.monthly_leaderboard_size,
            max_concurrent_days: self.max_concurrent_days,
            net_result_policy: self.net_result_policy,
        }
    }

    /// Parsed report deadline; falls back to the default on a bad value.
    pub fn timeout(&self) -> Duration {
        parse_duration(&self.report_timeout).unwrap_or(Duration::from_secs(30))
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub reports: ReportsConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            server: ServerConfig::default(),
            reports: ReportsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if self.reports.daily_leaderboard_size == 0 || self.reports.monthly_leaderboard_size == 0 {
            return Err(ConfigError::ValidationError(
                "Leaderboard sizes must be greater than 0".to_string(),
            ));
        }

        if self.reports.max_concurrent_days == 0 {
            return Err(ConfigError::ValidationError(
                "max_concurrent_days must be greater than 0".to_string(),
            ));
        }

        match parse_duration(&self.reports.report_timeout) {
            Some(d) if !d.is_zero() => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid report timeout: {:?}",
                    self.reports.report_timeout
                )))
            }
        }

        Ok(())
    }
}
