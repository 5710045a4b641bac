//! Configuration management for the MCP server.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables (optionally via a `.env` file) or
//! defaults.

use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Default per-invocation subprocess timeout.
pub const DEFAULT_SUBPROCESS_TIMEOUT_MS: u64 = 30_000;

/// Lower bound on the blocking worker pool.
const MIN_BLOCKING_WORKERS: usize = 2;

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Tool execution limits and the initial working directory.
    pub execution: ExecutionConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,

    /// Whether to include timestamps in log output.
    pub with_timestamps: bool,
}

/// How tools are executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Initial session working directory.
    pub working_dir: PathBuf,

    /// Maximum number of offloaded handlers running at once.
    pub max_blocking_workers: usize,

    /// Timeout applied to every subprocess a tool starts.
    pub subprocess_timeout_ms: u64,
}

impl ExecutionConfig {
    pub fn subprocess_timeout(&self) -> Duration {
        Duration::from_millis(self.subprocess_timeout_ms)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(MIN_BLOCKING_WORKERS);
        Self {
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            max_blocking_workers: workers.max(MIN_BLOCKING_WORKERS),
            subprocess_timeout_ms: DEFAULT_SUBPROCESS_TIMEOUT_MS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "fastfs-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                with_timestamps: true,
            },
            transport: TransportConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

/// Parse an environment variable, keeping `current` when it is unset or invalid.
fn env_parse<T: FromStr>(key: &str, current: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Invalid value for {}: '{}', using default", key, raw);
                current
            }
        },
        Err(_) => current,
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`.
    /// For example: `MCP_SERVER_NAME`, `MCP_LOG_LEVEL`, `MCP_WORKDIR`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.logging.with_timestamps =
            env_parse("MCP_LOG_TIMESTAMPS", config.logging.with_timestamps);

        // Load transport configuration from environment
        config.transport = TransportConfig::from_env();

        if let Ok(dir) = std::env::var("MCP_WORKDIR") {
            config.execution.working_dir = PathBuf::from(dir);
            info!(
                "Initial working directory: {}",
                config.execution.working_dir.display()
            );
        }

        let workers = env_parse(
            "MCP_MAX_BLOCKING_WORKERS",
            config.execution.max_blocking_workers,
        );
        config.execution.max_blocking_workers = if workers == 0 {
            warn!("MCP_MAX_BLOCKING_WORKERS must be positive, using {}", MIN_BLOCKING_WORKERS);
            MIN_BLOCKING_WORKERS
        } else {
            workers
        };

        let timeout = env_parse(
            "MCP_SUBPROCESS_TIMEOUT_MS",
            config.execution.subprocess_timeout_ms,
        );
        config.execution.subprocess_timeout_ms = if timeout == 0 {
            warn!("MCP_SUBPROCESS_TIMEOUT_MS must be positive, using default");
            DEFAULT_SUBPROCESS_TIMEOUT_MS
        } else {
            timeout
        };

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure env var tests run serially
    static ENV_TEST_LOCK: Mutex<()> = Mutex::new(());

    const KEYS: [&str; 4] = [
        "MCP_WORKDIR",
        "MCP_MAX_BLOCKING_WORKERS",
        "MCP_SUBPROCESS_TIMEOUT_MS",
        "MCP_LOG_TIMESTAMPS",
    ];

    fn clear_env() {
        for key in KEYS {
            unsafe {
                std::env::remove_var(key);
            }
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.name, "fastfs-mcp");
        assert!(config.execution.max_blocking_workers >= MIN_BLOCKING_WORKERS);
        assert_eq!(
            config.execution.subprocess_timeout(),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_execution_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var("MCP_WORKDIR", "/srv/data");
            std::env::set_var("MCP_MAX_BLOCKING_WORKERS", "7");
            std::env::set_var("MCP_SUBPROCESS_TIMEOUT_MS", "1500");
            std::env::set_var("MCP_LOG_TIMESTAMPS", "false");
        }
        let config = Config::from_env();
        assert_eq!(config.execution.working_dir, PathBuf::from("/srv/data"));
        assert_eq!(config.execution.max_blocking_workers, 7);
        assert_eq!(config.execution.subprocess_timeout_ms, 1500);
        assert!(!config.logging.with_timestamps);
        clear_env();
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var("MCP_MAX_BLOCKING_WORKERS", "0");
            std::env::set_var("MCP_SUBPROCESS_TIMEOUT_MS", "soon");
        }
        let config = Config::from_env();
        assert_eq!(config.execution.max_blocking_workers, MIN_BLOCKING_WORKERS);
        assert_eq!(
            config.execution.subprocess_timeout_ms,
            DEFAULT_SUBPROCESS_TIMEOUT_MS
        );
        clear_env();
    }
}
