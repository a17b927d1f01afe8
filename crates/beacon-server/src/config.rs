//! Server configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (BEACON_*)
//! - TOML configuration file

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Signaling endpoint configuration.
    #[serde(default)]
    pub signal: SignalConfig,

    /// Registry store configuration.
    #[serde(default)]
    pub store: StoreConfig,

    /// Event handling configuration.
    #[serde(default)]
    pub events: EventsConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Signaling endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Path for the WebSocket endpoint.
    #[serde(default = "default_signal_path")]
    pub path: String,

    /// Maximum accepted frame size in bytes. The wire protocol caps
    /// frames at [`beacon_protocol::MAX_FRAME_SIZE`]; configuration can
    /// only lower that, larger values are clamped down to it.
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,

    /// Outbound queue depth per connection.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

/// Which store backend holds the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Shared Redis; required when more than one server shares a registry.
    Redis,
    /// In-process memory; single-node development and tests only.
    Memory,
}

/// Registry store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend selection.
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Key namespace prefix.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Liveness TTL on connection entries, in seconds.
    #[serde(default = "default_connection_ttl")]
    pub connection_ttl_secs: u64,

    /// TTL on topic entries, in seconds.
    #[serde(default = "default_topic_ttl")]
    pub topic_ttl_secs: u64,

    /// Deadline per store operation, in milliseconds.
    #[serde(default = "default_op_timeout")]
    pub op_timeout_ms: u64,

    /// Expiry sweep interval, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

/// Event handling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Retries for an event that failed transiently.
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,

    /// Delay before a retry, in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Deadline per outbound push, in milliseconds.
    #[serde(default = "default_push_timeout")]
    pub push_timeout_ms: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_host() -> String {
    std::env::var("BEACON_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())
}

fn default_port() -> u16 {
    std::env::var("BEACON_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(4444)
}

fn default_true() -> bool {
    true
}

fn default_signal_path() -> String {
    "/signal".to_string()
}

fn default_max_frame_size() -> usize {
    beacon_protocol::MAX_FRAME_SIZE
}

fn default_outbound_queue() -> usize {
    64
}

fn default_backend() -> StoreBackend {
    match std::env::var("BEACON_STORE_BACKEND").as_deref() {
        Ok("memory") => StoreBackend::Memory,
        _ => StoreBackend::Redis,
    }
}

fn default_redis_url() -> String {
    std::env::var("BEACON_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

fn default_key_prefix() -> String {
    "beacon".to_string()
}

fn default_connection_ttl() -> u64 {
    3600 // 1 hour
}

fn default_topic_ttl() -> u64 {
    24 * 3600 // 24 hours
}

fn default_op_timeout() -> u64 {
    2_000 // 2 seconds
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_retry_budget() -> u32 {
    1
}

fn default_retry_delay() -> u64 {
    50
}

fn default_push_timeout() -> u64 {
    5_000 // 5 seconds
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            signal: SignalConfig::default(),
            store: StoreConfig::default(),
            events: EventsConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            path: default_signal_path(),
            max_frame_size: default_max_frame_size(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            redis_url: default_redis_url(),
            key_prefix: default_key_prefix(),
            connection_ttl_secs: default_connection_ttl(),
            topic_ttl_secs: default_topic_ttl(),
            op_timeout_ms: default_op_timeout(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            retry_budget: default_retry_budget(),
            retry_delay_ms: default_retry_delay(),
            push_timeout_ms: default_push_timeout(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_paths = [
            "beacon.toml",
            "/etc/beacon/beacon.toml",
            "~/.config/beacon/beacon.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Get the socket address to bind to.
    ///
    /// # Errors
    ///
    /// Returns an error if host/port do not form a valid address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }

    /// Registry TTLs and timeouts as durations.
    #[must_use]
    pub fn registry_config(&self) -> beacon_core::RegistryConfig {
        beacon_core::RegistryConfig {
            topic_ttl: Duration::from_secs(self.store.topic_ttl_secs),
            connection_ttl: Duration::from_secs(self.store.connection_ttl_secs),
            op_timeout: Duration::from_millis(self.store.op_timeout_ms),
        }
    }

    /// Per-push deadline as a duration.
    #[must_use]
    pub fn push_timeout(&self) -> Duration {
        Duration::from_millis(self.events.push_timeout_ms)
    }

    /// Effective inbound frame cap: the configured size, clamped to the
    /// protocol codec's hard ceiling.
    #[must_use]
    pub fn frame_cap(&self) -> usize {
        self.signal.max_frame_size.min(beacon_protocol::MAX_FRAME_SIZE)
    }
}
