//! Configuration — TOML-based service configuration.
//!
//! Loads and validates configuration from `config.toml` at startup.
//! Exchange endpoints and symbol sets are externalized here — nothing is
//! hardcoded in the adapters.

pub mod loader;

use serde::Deserialize;

/// Top-level service configuration, loaded from `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Service identity and HTTP facade settings.
    pub service: ServiceConfig,
    /// Streaming/polling cadence and request timeouts.
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Analysis thresholds.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Static per-exchange endpoint and symbol configuration.
    pub exchanges: Vec<ExchangeConfig>,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Human-readable service name.
    pub name: String,
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// HTTP facade bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Ingestion cadence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Fixed delay before a streaming reconnect attempt (milliseconds).
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_ms: u64,
    /// Periodic REST refresh interval (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Per-request timeout for REST polls (milliseconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            reconnect_interval_ms: default_reconnect_interval(),
            poll_interval_ms: default_poll_interval(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// Analysis threshold configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Funding-rate epsilon band for trend/sentiment classification.
    #[serde(default = "default_trend_epsilon")]
    pub trend_epsilon: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            trend_epsilon: default_trend_epsilon(),
        }
    }
}

/// Static configuration for one exchange adapter.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    /// Adapter identifier: "binance", "bybit", or "okx".
    pub id: String,
    /// Human-readable exchange name.
    pub display_name: String,
    /// Streaming endpoint (template for exchanges that subscribe via path).
    pub ws_url: String,
    /// Polling endpoint base URL.
    pub rest_url: String,
    /// Symbols this exchange covers, in its own symbol notation.
    pub symbols: Vec<String>,
}

// Default value functions for serde

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_reconnect_interval() -> u64 {
    5_000
}

fn default_poll_interval() -> u64 {
    60_000
}

fn default_request_timeout() -> u64 {
    5_000
}

fn default_trend_epsilon() -> f64 {
    crate::domain::analysis::DEFAULT_TREND_EPSILON
}
