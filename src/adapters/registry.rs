//! Static adapter registry.
//!
//! Builds one adapter per configured exchange, keyed by exchange id. A
//! broken entry disables that adapter only — the remaining exchanges keep
//! ingesting.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::config::{AppConfig, ExchangeConfig};
use crate::domain::metrics::Exchange;
use crate::error::IngestError;
use crate::ports::exchange::ExchangeAdapter;

use super::{BinanceAdapter, BybitAdapter, OkxAdapter};

/// Build all adapters the config describes, skipping misconfigured entries.
pub fn build_adapters(config: &AppConfig) -> Vec<Arc<dyn ExchangeAdapter>> {
    let timeout = Duration::from_millis(config.ingest.request_timeout_ms);
    let mut adapters: Vec<Arc<dyn ExchangeAdapter>> = Vec::with_capacity(config.exchanges.len());

    for entry in &config.exchanges {
        match build_adapter(entry, timeout) {
            Ok(adapter) => {
                info!(
                    exchange = %adapter.exchange(),
                    symbols = adapter.symbols().len(),
                    "Exchange adapter registered"
                );
                adapters.push(adapter);
            }
            Err(e) => {
                error!(exchange = %entry.id, error = %e, "Skipping misconfigured exchange");
            }
        }
    }

    adapters
}

fn build_adapter(
    config: &ExchangeConfig,
    timeout: Duration,
) -> Result<Arc<dyn ExchangeAdapter>, IngestError> {
    match Exchange::from_id(&config.id) {
        Some(Exchange::Binance) => Ok(Arc::new(BinanceAdapter::new(config, timeout)?)),
        Some(Exchange::Bybit) => Ok(Arc::new(BybitAdapter::new(config, timeout)?)),
        Some(Exchange::Okx) => Ok(Arc::new(OkxAdapter::new(config, timeout)?)),
        None => Err(IngestError::Configuration(format!(
            "unknown exchange id '{}'",
            config.id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisConfig, IngestConfig, ServiceConfig};

    fn exchange(id: &str) -> ExchangeConfig {
        ExchangeConfig {
            id: id.to_string(),
            display_name: id.to_string(),
            ws_url: "wss://example.com/ws".to_string(),
            rest_url: "https://example.com".to_string(),
            symbols: vec!["BTCUSDT".to_string()],
        }
    }

    fn config(exchanges: Vec<ExchangeConfig>) -> AppConfig {
        AppConfig {
            service: ServiceConfig {
                name: "test".to_string(),
                log_level: "info".to_string(),
                bind_address: "127.0.0.1:0".to_string(),
            },
            ingest: IngestConfig::default(),
            analysis: AnalysisConfig::default(),
            exchanges,
        }
    }

    #[test]
    fn builds_all_known_exchanges() {
        let adapters = build_adapters(&config(vec![
            exchange("binance"),
            exchange("bybit"),
            exchange("okx"),
        ]));
        assert_eq!(adapters.len(), 3);
    }

    #[test]
    fn unknown_exchange_is_skipped_not_fatal() {
        let adapters = build_adapters(&config(vec![exchange("binance"), exchange("deribit")]));
        assert_eq!(adapters.len(), 1);
        assert_eq!(adapters[0].exchange(), Exchange::Binance);
    }
}
