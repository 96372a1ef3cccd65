//! Poll refresher — periodic REST backstop for the streaming feeds.
//!
//! Every cycle polls open interest, funding rate, and long/short ratio per
//! adapter/symbol and feeds the results through the same store write path as
//! the streams. Best-effort: one symbol's failure is logged and skipped, and
//! one adapter's failure never blocks another's cycle. Also invokable
//! on-demand (the facade's force-update endpoint).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, broadcast};
use tracing::{info, instrument, warn};

use crate::domain::metrics::MetricUpdate;
use crate::ports::exchange::ExchangeAdapter;
use crate::store::MetricStore;

/// Timer-driven REST refresher over all registered adapters.
pub struct PollRefresher {
    adapters: Vec<Arc<dyn ExchangeAdapter>>,
    store: Arc<MetricStore>,
    interval: Duration,
    last_refresh: RwLock<DateTime<Utc>>,
}

impl PollRefresher {
    pub fn new(
        adapters: Vec<Arc<dyn ExchangeAdapter>>,
        store: Arc<MetricStore>,
        interval: Duration,
    ) -> Self {
        Self {
            adapters,
            store,
            interval,
            last_refresh: RwLock::new(Utc::now()),
        }
    }

    /// Run the periodic refresh loop until shutdown.
    ///
    /// One immediate cycle runs before the timer starts so the store is
    /// populated without waiting a full interval.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        self.refresh_once().await;

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Poll refresher stopped");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.interval) => {
                    self.refresh_once().await;
                }
            }
        }
    }

    /// One full refresh cycle across all adapters and symbols.
    pub async fn refresh_once(&self) {
        info!("Refreshing metrics from REST APIs");

        for adapter in &self.adapters {
            let exchange = adapter.exchange();

            for symbol in adapter.symbols() {
                match adapter.poll_open_interest(symbol).await {
                    Ok(record) => {
                        self.store.upsert(MetricUpdate::OpenInterest(record));
                    }
                    Err(e) => {
                        warn!(%exchange, %symbol, error = %e, "Open interest poll failed, skipping");
                    }
                }

                match adapter.poll_funding_rate(symbol).await {
                    Ok(record) => {
                        self.store.upsert(MetricUpdate::FundingRate(record));
                    }
                    Err(e) => {
                        warn!(%exchange, %symbol, error = %e, "Funding rate poll failed, skipping");
                    }
                }

                match adapter.poll_long_short_ratio(symbol).await {
                    Ok(record) => {
                        self.store.upsert(MetricUpdate::LongShortRatio(record));
                    }
                    Err(e) => {
                        warn!(%exchange, %symbol, error = %e, "Long/short poll failed, skipping");
                    }
                }
            }
        }

        *self.last_refresh.write().await = Utc::now();
        info!(records = self.store.total_size(), "REST refresh completed");
    }

    /// When the last refresh cycle completed.
    pub async fn last_refresh(&self) -> DateTime<Utc> {
        *self.last_refresh.read().await
    }
}
