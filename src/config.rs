use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config directory")]
    NoConfigDir,

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RegistryConfig {
    /// Ownership marker: holds the running daemon's PID in decimal text.
    /// A leading `~` is expanded once at load.
    #[serde(default = "default_pid_file")]
    pub pid_file: String,

    /// Activity marker: a zero-content file whose existence means the
    /// periodic nudge is enabled.
    #[serde(default = "default_active_file")]
    pub active_file: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            pid_file: default_pid_file(),
            active_file: default_active_file(),
        }
    }
}

fn default_pid_file() -> String {
    "~/.nodoze.pid".to_string()
}

fn default_active_file() -> String {
    "~/.nodoze.active".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DaemonConfig {
    /// Tick interval in microseconds.
    #[serde(default = "default_interval_us")]
    pub interval_us: u64,

    /// Command run (via `sh -c`) on each active tick. Its exit status is
    /// ignored by the daemon loop.
    #[serde(default = "default_nudge_command")]
    pub nudge_command: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_us: default_interval_us(),
            nudge_command: default_nudge_command(),
        }
    }
}

fn default_interval_us() -> u64 {
    30_000_000
}

fn default_nudge_command() -> String {
    "xdotool mousemove_relative --sync -- 1 0 && xdotool mousemove_relative --sync -- -1 0"
        .to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_path(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        ProjectDirs::from("com", "nodoze", "nodoze")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from file, or create default if not exists
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daemon.interval_us == 0 {
            return Err(ConfigError::ValidationError(
                "interval_us must be positive".into(),
            ));
        }

        if self.registry.pid_file.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "pid_file must not be empty".into(),
            ));
        }

        if self.registry.active_file.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "active_file must not be empty".into(),
            ));
        }

        if self.registry.pid_file == self.registry.active_file {
            return Err(ConfigError::ValidationError(
                "pid_file and active_file must be distinct paths".into(),
            ));
        }

        Ok(())
    }

    /// Save config to file
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;

        info!("Config saved to: {}", path.display());
        Ok(())
    }

    /// Expanded ownership-marker path.
    pub fn pid_path(&self) -> PathBuf {
        expand_path(&self.registry.pid_file)
    }

    /// Expanded activity-marker path.
    pub fn active_path(&self) -> PathBuf {
        expand_path(&self.registry.active_file)
    }

    /// Tick interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_micros(self.daemon.interval_us)
    }
}
