//! Streaming subscriber — one persistent WebSocket per exchange.
//!
//! State machine: `Disconnected -> Connecting -> Subscribed`, back to
//! `Disconnected` on transport error or remote close, with a fixed-delay
//! reconnect (not exponential — only a handful of persistent connections
//! exist per process). `Stopped` is entered on explicit shutdown only; there
//! is no retry cap.
//!
//! Socket I/O is decoupled from store updates: inbound text frames are
//! forwarded to a single-consumer channel whose consumer parses and upserts,
//! so the update path is testable without a live socket.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, instrument, warn};

use crate::ports::exchange::ExchangeAdapter;
use crate::store::MetricStore;

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Subscribed = 2,
    /// Terminal; entered on explicit shutdown only.
    Stopped = 3,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Subscribed => f.write_str("subscribed"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

impl From<u8> for ConnectionState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Subscribed,
            3 => Self::Stopped,
            _ => Self::Disconnected,
        }
    }
}

/// Owns one exchange's streaming connection and its reconnect loop.
pub struct StreamSubscriber {
    adapter: Arc<dyn ExchangeAdapter>,
    store: Arc<MetricStore>,
    reconnect_interval: Duration,
    state: AtomicU8,
}

impl StreamSubscriber {
    pub fn new(
        adapter: Arc<dyn ExchangeAdapter>,
        store: Arc<MetricStore>,
        reconnect_interval: Duration,
    ) -> Self {
        Self {
            adapter,
            store,
            reconnect_interval,
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
        }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from(self.state.load(Ordering::Relaxed))
    }

    pub fn exchange(&self) -> crate::domain::metrics::Exchange {
        self.adapter.exchange()
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Relaxed);
    }

    /// Run the connection loop until shutdown.
    ///
    /// Reconnects after a fixed delay on every failure, indefinitely —
    /// availability wins over fail-fast.
    #[instrument(skip(self, shutdown_rx), fields(exchange = %self.adapter.exchange()))]
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("Starting streaming subscriber");

        loop {
            self.set_state(ConnectionState::Connecting);

            match self.connect_and_stream(&mut shutdown_rx).await {
                Ok(()) => {
                    self.set_state(ConnectionState::Stopped);
                    info!("Streaming subscriber stopped");
                    return Ok(());
                }
                Err(e) => {
                    self.set_state(ConnectionState::Disconnected);
                    warn!(
                        error = %e,
                        delay_ms = self.reconnect_interval.as_millis() as u64,
                        "Stream disconnected, scheduling reconnect"
                    );
                    // Check shutdown before sleeping off the backoff.
                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            self.set_state(ConnectionState::Stopped);
                            return Ok(());
                        }
                        _ = tokio::time::sleep(self.reconnect_interval) => {}
                    }
                }
            }
        }
    }

    /// Single session: connect, handshake once, stream until error/shutdown.
    async fn connect_and_stream(
        &self,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Result<()> {
        let url = self.adapter.stream_url();
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .context("WebSocket connection failed")?;

        let (mut write, mut read) = ws_stream.split();

        // Exactly one handshake per connection, sent at transport open.
        // Adapters that subscribe via the URL path return None here.
        if let Some(payload) = self.adapter.subscribe_payload() {
            write
                .send(Message::Text(payload))
                .await
                .context("subscribe handshake failed")?;
        }

        self.set_state(ConnectionState::Subscribed);
        info!("Stream subscribed");

        let (frame_tx, frame_rx) = mpsc::channel::<String>(1024);
        let consumer = tokio::spawn(consume_frames(
            Arc::clone(&self.adapter),
            Arc::clone(&self.store),
            frame_rx,
        ));

        let result = loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal in streaming subscriber");
                    break Ok(());
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if frame_tx.send(text).await.is_err() {
                                break Err(anyhow::anyhow!("frame consumer gone"));
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            // Pong is handled automatically by tungstenite.
                            debug!(len = data.len(), "Ping received");
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            break Err(anyhow::anyhow!("WebSocket error: {e}"));
                        }
                        None => {
                            break Err(anyhow::anyhow!("WebSocket stream ended"));
                        }
                    }
                }
            }
        };

        // Close the channel and let the consumer drain in-flight frames.
        drop(frame_tx);
        let _ = consumer.await;

        result
    }
}

/// Consume raw frames from the per-connection channel: parse via the adapter
/// and upsert the normalized updates.
///
/// Frames are processed in arrival order, so the latest frame wins for any
/// key. Parse failures drop the frame and leave the connection alone.
pub async fn consume_frames(
    adapter: Arc<dyn ExchangeAdapter>,
    store: Arc<MetricStore>,
    mut frames: mpsc::Receiver<String>,
) {
    while let Some(frame) = frames.recv().await {
        match adapter.parse_stream_frame(&frame) {
            Ok(updates) => {
                for update in updates {
                    store.upsert(update);
                }
            }
            Err(e) => {
                debug!(
                    exchange = %adapter.exchange(),
                    error = %e,
                    "Dropping unparseable frame"
                );
            }
        }
    }
}
