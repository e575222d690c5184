//! Configuration for LodeKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for a LodeKV server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Persistence Configuration
    // -------------------------------------------------------------------------
    /// Snapshot file, read once at startup and rewritten at shutdown
    pub snapshot_path: PathBuf,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Connections silent for longer than this are closed by the reactor
    pub idle_timeout: Duration,

    /// Upper bound on a single poll wait, so the idle sweep always runs
    pub poll_interval: Duration,

    /// Capacity of the readiness event buffer handed to each poll
    pub max_events: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("data.db"),
            listen_addr: "127.0.0.1:8080".to_string(),
            idle_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
            max_events: 1024,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the snapshot file path
    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.snapshot_path = path.into();
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the idle timeout after which silent connections are reaped
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Set the maximum time a single poll may block
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the readiness event buffer capacity
    pub fn max_events(mut self, count: usize) -> Self {
        self.config.max_events = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
