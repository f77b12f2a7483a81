//! Service configuration
//!
//! Every field has a stated default and can be overridden through `RELAY_*`
//! environment variables (e.g. `RELAY_POLL_INTERVAL_MS=500`,
//! `RELAY_DATABASE_URL=postgres://...`).

use std::time::Duration;

use config::{Config as ConfigBuilder, ConfigError, Environment};
use serde::Deserialize;

/// Relay service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bind host for the WebSocket server.
    pub host: String,
    /// Bind port for the WebSocket server.
    pub port: u16,
    /// Postgres connection URL for the snapshot store.
    pub database_url: String,
    /// Maximum connections in the store pool.
    pub db_max_connections: u32,
    /// Symbol stamped on every broadcast ticker snapshot.
    pub symbol: String,
    /// Snapshot store table holding the price records.
    pub table: String,
    /// The single WebSocket path subscribers may connect to.
    pub ws_path: String,
    /// Steady-state poll interval, milliseconds.
    pub poll_interval_ms: u64,
    /// Retry interval after a store fetch failure, milliseconds.
    pub error_retry_ms: u64,
    /// Heartbeat broadcast interval, milliseconds.
    pub heartbeat_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8765,
            database_url: "postgresql://localhost:5432/market".to_string(),
            db_max_connections: 5,
            symbol: "USD_JPY".to_string(),
            table: "ticker_usd_jpy".to_string(),
            ws_path: "/ws/ticker_usd_jpy".to_string(),
            poll_interval_ms: 1_000,
            error_retry_ms: 3_000,
            heartbeat_interval_ms: 30_000,
        }
    }
}

impl Config {
    /// Load configuration: `RELAY_*` environment variables over defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        ConfigBuilder::builder()
            .add_source(Environment::with_prefix("RELAY").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn error_retry(&self) -> Duration {
        Duration::from_millis(self.error_retry_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
