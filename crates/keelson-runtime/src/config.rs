//! Engine configuration
//!
//! Compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Environment variables (runtime)
//! 2. Builder methods
//! 3. Library defaults

use std::path::PathBuf;
use std::time::Duration;

use keelson_core::env::env_get;

use crate::error::{Result, RuntimeError};
use crate::logger::{LogConfig, LogLevel};

pub mod defaults {
    pub const WORKER_THREADS: usize = 8;
    pub const POLLER_MAX_EVENTS: usize = 1024;
    pub const IDLE_TIMEOUT_MS: u64 = 60_000;
    pub const CONN_BUFFER_SIZE: usize = 1024;
    pub const LOG_DIRECTORY: &str = "./log";
    pub const LOG_SUFFIX: &str = ".log";
    pub const LOG_QUEUE_CAPACITY: usize = 1024;
    pub const LOG_MAX_LINES: u64 = 50_000;
}

/// Engine configuration with builder pattern.
///
/// Use `from_env()` to start with the defaults and apply any
/// environment variable overrides.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Worker pool size
    pub worker_threads: usize,
    /// Poller event-list capacity per wait cycle
    pub poller_max_events: usize,
    /// Idle-eviction deadline per connection
    pub idle_timeout: Duration,
    /// Initial per-connection buffer capacity
    pub conn_buffer_size: usize,
    /// Log threshold
    pub log_level: LogLevel,
    /// Log file directory
    pub log_directory: PathBuf,
    /// Log file suffix
    pub log_suffix: String,
    /// Log queue capacity (0 = synchronous logging)
    pub log_queue_capacity: usize,
    /// Lines per log file before a size split
    pub log_max_lines: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl EngineConfig {
    /// Create config from defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `KEELSON_WORKERS` - Worker pool size
    /// - `KEELSON_MAX_EVENTS` - Poller event-list capacity
    /// - `KEELSON_IDLE_TIMEOUT_MS` - Idle eviction deadline
    /// - `KEELSON_BUF_SIZE` - Initial connection buffer capacity
    /// - `KEELSON_LOG_LEVEL` - debug|info|warn|error (or 0-3)
    /// - `KEELSON_LOG_DIR` - Log directory
    /// - `KEELSON_LOG_SUFFIX` - Log file suffix
    /// - `KEELSON_LOG_QUEUE` - Log queue capacity (0 = sync)
    /// - `KEELSON_LOG_MAX_LINES` - Lines per log file
    pub fn from_env() -> Self {
        Self {
            worker_threads: env_get("KEELSON_WORKERS", defaults::WORKER_THREADS),
            poller_max_events: env_get("KEELSON_MAX_EVENTS", defaults::POLLER_MAX_EVENTS),
            idle_timeout: Duration::from_millis(env_get(
                "KEELSON_IDLE_TIMEOUT_MS",
                defaults::IDLE_TIMEOUT_MS,
            )),
            conn_buffer_size: env_get("KEELSON_BUF_SIZE", defaults::CONN_BUFFER_SIZE),
            log_level: env_get("KEELSON_LOG_LEVEL", LogLevel::Info),
            log_directory: PathBuf::from(env_get(
                "KEELSON_LOG_DIR",
                defaults::LOG_DIRECTORY.to_string(),
            )),
            log_suffix: env_get("KEELSON_LOG_SUFFIX", defaults::LOG_SUFFIX.to_string()),
            log_queue_capacity: env_get("KEELSON_LOG_QUEUE", defaults::LOG_QUEUE_CAPACITY),
            log_max_lines: env_get("KEELSON_LOG_MAX_LINES", defaults::LOG_MAX_LINES),
        }
    }

    /// Create config with explicit defaults (no env override).
    pub fn new() -> Self {
        Self {
            worker_threads: defaults::WORKER_THREADS,
            poller_max_events: defaults::POLLER_MAX_EVENTS,
            idle_timeout: Duration::from_millis(defaults::IDLE_TIMEOUT_MS),
            conn_buffer_size: defaults::CONN_BUFFER_SIZE,
            log_level: LogLevel::Info,
            log_directory: PathBuf::from(defaults::LOG_DIRECTORY),
            log_suffix: defaults::LOG_SUFFIX.into(),
            log_queue_capacity: defaults::LOG_QUEUE_CAPACITY,
            log_max_lines: defaults::LOG_MAX_LINES,
        }
    }

    // Builder methods

    pub fn worker_threads(mut self, n: usize) -> Self {
        self.worker_threads = n;
        self
    }

    pub fn poller_max_events(mut self, n: usize) -> Self {
        self.poller_max_events = n;
        self
    }

    pub fn idle_timeout(mut self, d: Duration) -> Self {
        self.idle_timeout = d;
        self
    }

    pub fn conn_buffer_size(mut self, n: usize) -> Self {
        self.conn_buffer_size = n;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn log_directory(mut self, dir: PathBuf) -> Self {
        self.log_directory = dir;
        self
    }

    pub fn log_queue_capacity(mut self, n: usize) -> Self {
        self.log_queue_capacity = n;
        self
    }

    /// The logger's slice of this config.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level,
            directory: self.log_directory.clone(),
            suffix: self.log_suffix.clone(),
            queue_capacity: self.log_queue_capacity,
            max_lines_per_file: self.log_max_lines,
        }
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(RuntimeError::InvalidConfig("worker_threads must be > 0"));
        }
        if self.worker_threads > 256 {
            return Err(RuntimeError::InvalidConfig("worker_threads must be <= 256"));
        }
        if self.poller_max_events == 0 {
            return Err(RuntimeError::InvalidConfig("poller_max_events must be > 0"));
        }
        if self.conn_buffer_size == 0 {
            return Err(RuntimeError::InvalidConfig("conn_buffer_size must be > 0"));
        }
        if self.idle_timeout.is_zero() {
            return Err(RuntimeError::InvalidConfig("idle_timeout must be > 0"));
        }
        if self.log_max_lines == 0 {
            return Err(RuntimeError::InvalidConfig("log_max_lines must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = EngineConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.worker_threads, 8);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .worker_threads(4)
            .idle_timeout(Duration::from_secs(5))
            .log_level(LogLevel::Debug);

        assert_eq!(config.worker_threads, 4);
        assert_eq!(config.idle_timeout, Duration::from_secs(5));
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_validation_rejects_zero_workers() {
        let config = EngineConfig::new().worker_threads(0);
        assert!(config.validate().is_err());

        let config = EngineConfig::new().worker_threads(1000);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_config_slice() {
        let config = EngineConfig::new().log_queue_capacity(0);
        let log = config.log_config();
        assert_eq!(log.queue_capacity, 0);
        assert_eq!(log.max_lines_per_file, defaults::LOG_MAX_LINES);
    }
}
