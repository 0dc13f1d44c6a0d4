//! Configuration loading and types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the fleetaudit CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Shell binary carrying the pipelines
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Per-query timeout in seconds
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    /// Default recency cutoff for directory mode, in days
    #[serde(default = "default_machine_age_days")]
    pub machine_age_days: i64,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            query_timeout_secs: default_query_timeout_secs(),
            machine_age_days: default_machine_age_days(),
            log_level: default_log_level(),
        }
    }
}

fn default_shell() -> String {
    fleetaudit_exec::shell::default_binary().to_string()
}

fn default_query_timeout_secs() -> u64 {
    120
}

fn default_machine_age_days() -> i64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load(path: &PathBuf) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from default paths or fall back to defaults
    ///
    /// # Errors
    /// Returns an error only when a config file exists but cannot be parsed
    pub fn load_default() -> eyre::Result<Self> {
        // Check environment variable
        if let Ok(path) = std::env::var("FLEETAUDIT_CONFIG") {
            return Self::load(&PathBuf::from(path));
        }

        // Try common paths
        let paths = [
            PathBuf::from("fleetaudit.toml"),
            PathBuf::from("/etc/fleetaudit/fleetaudit.toml"),
            dirs::config_dir()
                .map(|p| p.join("fleetaudit/fleetaudit.toml"))
                .unwrap_or_default(),
        ];

        for path in paths {
            if path.exists() {
                return Self::load(&path);
            }
        }

        tracing::debug!("no config file found, using defaults");
        Ok(Config::default())
    }
}
