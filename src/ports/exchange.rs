//! Exchange adapter port.
//!
//! One implementation per exchange. Variants differ only in wire message
//! shape, field names/units, and endpoint paths; the streaming subscriber
//! and poll refresher are generic over this trait.

use async_trait::async_trait;

use crate::domain::metrics::{
    Exchange, FundingRateRecord, LongShortRatioRecord, MetricUpdate, OpenInterestRecord,
};
use crate::error::IngestError;

/// Translation unit between one exchange's wire formats and the normalized
/// metric model.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync + 'static {
    fn exchange(&self) -> Exchange;

    fn display_name(&self) -> &str;

    /// The symbol set this exchange covers (some exchanges exclude symbols).
    fn symbols(&self) -> &[String];

    /// Full WebSocket URL for the streaming subscription. Exchanges that
    /// subscribe implicitly encode the requested channels in the path.
    fn stream_url(&self) -> String;

    /// Explicit subscribe handshake payload, sent once per connection
    /// immediately after the transport opens. `None` for exchanges that
    /// stream everything requested via the URL.
    fn subscribe_payload(&self) -> Option<String>;

    /// Parse one inbound frame into zero or more normalized updates.
    ///
    /// Control frames (subscribe acks, heartbeats) yield an empty vec. A
    /// `Parse` error is non-fatal: the frame is dropped and the connection
    /// stays open.
    fn parse_stream_frame(&self, frame: &str) -> Result<Vec<MetricUpdate>, IngestError>;

    /// Fetch the latest open interest for one symbol via REST.
    async fn poll_open_interest(&self, symbol: &str)
        -> Result<OpenInterestRecord, IngestError>;

    /// Fetch the latest funding rate for one symbol via REST.
    async fn poll_funding_rate(&self, symbol: &str) -> Result<FundingRateRecord, IngestError>;

    /// Fetch the latest long/short positioning for one symbol via REST.
    async fn poll_long_short_ratio(
        &self,
        symbol: &str,
    ) -> Result<LongShortRatioRecord, IngestError>;
}
