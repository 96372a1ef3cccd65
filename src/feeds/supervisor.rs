//! Feed supervisor — lifecycle management for streaming connections.
//!
//! Spawns one subscriber task per exchange adapter, each with independent
//! reconnection, and aggregates health for the /health endpoint. Shutdown
//! is coordinated through the shared broadcast channel so every retry loop
//! stops deterministically.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info, instrument};

use crate::domain::metrics::Exchange;
use crate::ports::exchange::ExchangeAdapter;
use crate::store::MetricStore;

use super::subscriber::{ConnectionState, StreamSubscriber};

/// Supervises all streaming subscriber tasks.
pub struct FeedSupervisor {
    subscribers: Vec<Arc<StreamSubscriber>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl FeedSupervisor {
    pub fn new(
        adapters: &[Arc<dyn ExchangeAdapter>],
        store: &Arc<MetricStore>,
        reconnect_interval: Duration,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        let subscribers = adapters
            .iter()
            .map(|adapter| {
                Arc::new(StreamSubscriber::new(
                    Arc::clone(adapter),
                    Arc::clone(store),
                    reconnect_interval,
                ))
            })
            .collect();

        Self {
            subscribers,
            shutdown_tx,
        }
    }

    /// Spawn all subscriber tasks and return their join handles.
    #[instrument(skip(self))]
    pub fn spawn(&self) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::with_capacity(self.subscribers.len());

        for subscriber in &self.subscribers {
            let subscriber = Arc::clone(subscriber);
            let shutdown_rx = self.shutdown_tx.subscribe();

            handles.push(tokio::spawn(async move {
                if let Err(e) = subscriber.run(shutdown_rx).await {
                    error!(error = %e, "Streaming subscriber task failed");
                }
            }));
        }

        info!(feed_count = handles.len(), "Streaming tasks spawned");
        handles
    }

    /// Current state per exchange, for health reporting.
    pub fn states(&self) -> Vec<(Exchange, ConnectionState)> {
        self.subscribers
            .iter()
            .map(|s| (s.exchange(), s.state()))
            .collect()
    }

    /// At least one stream is live (degraded mode is OK).
    pub fn is_healthy(&self) -> bool {
        self.subscribers
            .iter()
            .any(|s| s.state() == ConnectionState::Subscribed)
    }
}
