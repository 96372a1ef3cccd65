//! Configuration loading and validation.
//!
//! Handles reading `config.toml`, validating all parameters, and providing
//! clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
    let path = Path::new(path);

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: AppConfig =
        toml::from_str(&content).with_context(|| "Failed to parse config.toml")?;

    validate_config(&config)?;

    info!(
        service = %config.service.name,
        exchanges = config.exchanges.len(),
        poll_interval_ms = config.ingest.poll_interval_ms,
        reconnect_interval_ms = config.ingest.reconnect_interval_ms,
        "Configuration loaded successfully"
    );

    Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
    anyhow::ensure!(
        !config.exchanges.is_empty(),
        "At least one exchange must be configured"
    );

    for (i, exchange) in config.exchanges.iter().enumerate() {
        anyhow::ensure!(
            !exchange.id.is_empty(),
            "Exchange {} has empty id",
            i
        );
        anyhow::ensure!(
            !exchange.ws_url.is_empty(),
            "Exchange {} ({}) has empty ws_url",
            i,
            exchange.id
        );
        anyhow::ensure!(
            !exchange.rest_url.is_empty(),
            "Exchange {} ({}) has empty rest_url",
            i,
            exchange.id
        );
        anyhow::ensure!(
            !exchange.symbols.is_empty(),
            "Exchange {} ({}) has no symbols configured",
            i,
            exchange.id
        );
    }

    anyhow::ensure!(
        config.ingest.reconnect_interval_ms > 0,
        "reconnect_interval_ms must be positive"
    );
    anyhow::ensure!(
        config.ingest.poll_interval_ms > 0,
        "poll_interval_ms must be positive"
    );
    anyhow::ensure!(
        config.ingest.request_timeout_ms > 0,
        "request_timeout_ms must be positive"
    );

    anyhow::ensure!(
        config.analysis.trend_epsilon >= 0.0 && config.analysis.trend_epsilon.is_finite(),
        "trend_epsilon must be a non-negative finite number, got {}",
        config.analysis.trend_epsilon
    );

    anyhow::ensure!(
        !config.service.bind_address.is_empty(),
        "Service bind_address must not be empty"
    );

    Ok(())
}
