//! Binance USDⓈ-M futures adapter.
//!
//! Streaming: open-interest channels are encoded in the WebSocket URL path
//! (`{symbol}@openInterest` segments), so no subscribe handshake is needed.
//! Polling: `/fapi/v1/openInterest`, `/fapi/v1/fundingRate`, and
//! `/futures/data/globalLongShortAccountRatio`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::config::ExchangeConfig;
use crate::domain::metrics::{
    Exchange, FundingRateRecord, LongShortRatioRecord, MetricUpdate, OpenInterestRecord,
};
use crate::error::IngestError;
use crate::ports::exchange::ExchangeAdapter;

use super::rest::RestClient;
use super::{de_flexible_f64, de_opt_flexible_f64};

/// Stream frame envelope; non-data frames deserialize with `data: None`.
#[derive(Debug, Deserialize)]
struct StreamFrame {
    #[serde(default)]
    data: Option<OpenInterestEvent>,
}

#[derive(Debug, Deserialize)]
struct OpenInterestEvent {
    symbol: String,
    #[serde(rename = "openInterest", deserialize_with = "de_flexible_f64")]
    open_interest: f64,
    #[serde(
        rename = "openInterestValue",
        default,
        deserialize_with = "de_opt_flexible_f64"
    )]
    open_interest_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OpenInterestResponse {
    symbol: String,
    #[serde(rename = "openInterest", deserialize_with = "de_flexible_f64")]
    open_interest: f64,
    #[serde(
        rename = "openInterestValue",
        default,
        deserialize_with = "de_opt_flexible_f64"
    )]
    open_interest_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FundingRateEntry {
    symbol: String,
    #[serde(rename = "fundingRate", deserialize_with = "de_flexible_f64")]
    funding_rate: f64,
    #[serde(rename = "nextFundingTime", default)]
    next_funding_time: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LongShortEntry {
    symbol: String,
    #[serde(rename = "longAccount", deserialize_with = "de_flexible_f64")]
    long_account: f64,
    #[serde(rename = "shortAccount", deserialize_with = "de_flexible_f64")]
    short_account: f64,
    #[serde(rename = "longShortRatio", deserialize_with = "de_flexible_f64")]
    long_short_ratio: f64,
}

/// Binance exchange adapter.
pub struct BinanceAdapter {
    display_name: String,
    ws_url: String,
    symbols: Vec<String>,
    rest: RestClient,
}

impl BinanceAdapter {
    pub fn new(config: &ExchangeConfig, timeout: Duration) -> Result<Self, IngestError> {
        Ok(Self {
            display_name: config.display_name.clone(),
            ws_url: config.ws_url.clone(),
            symbols: config.symbols.clone(),
            rest: RestClient::new(&config.rest_url, timeout)?,
        })
    }
}

#[async_trait]
impl ExchangeAdapter for BinanceAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::Binance
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn symbols(&self) -> &[String] {
        &self.symbols
    }

    fn stream_url(&self) -> String {
        let channels: Vec<String> = self
            .symbols
            .iter()
            .map(|s| format!("{}@openInterest", s.to_lowercase()))
            .collect();
        format!("{}{}", self.ws_url, channels.join("/"))
    }

    fn subscribe_payload(&self) -> Option<String> {
        // Channels are encoded in the URL path.
        None
    }

    fn parse_stream_frame(&self, frame: &str) -> Result<Vec<MetricUpdate>, IngestError> {
        let frame: StreamFrame = serde_json::from_str(frame)?;

        let Some(event) = frame.data else {
            return Ok(Vec::new());
        };

        Ok(vec![MetricUpdate::OpenInterest(OpenInterestRecord::new(
            Exchange::Binance,
            event.symbol,
            event.open_interest,
            event.open_interest_value.unwrap_or(0.0),
            Utc::now(),
        ))])
    }

    async fn poll_open_interest(
        &self,
        symbol: &str,
    ) -> Result<OpenInterestRecord, IngestError> {
        let response: OpenInterestResponse = self
            .rest
            .get_json("/fapi/v1/openInterest", &[("symbol", symbol)])
            .await?;

        Ok(OpenInterestRecord::new(
            Exchange::Binance,
            response.symbol,
            response.open_interest,
            response.open_interest_value.unwrap_or(0.0),
            Utc::now(),
        ))
    }

    async fn poll_funding_rate(&self, symbol: &str) -> Result<FundingRateRecord, IngestError> {
        let entries: Vec<FundingRateEntry> = self
            .rest
            .get_json(
                "/fapi/v1/fundingRate",
                &[("symbol", symbol), ("limit", "1")],
            )
            .await?;

        let entry = entries
            .into_iter()
            .next_back()
            .ok_or_else(|| IngestError::Parse(format!("empty funding rate list for {symbol}")))?;

        Ok(FundingRateRecord::new(
            Exchange::Binance,
            entry.symbol,
            entry.funding_rate,
            entry.next_funding_time.unwrap_or(0),
            Utc::now(),
        ))
    }

    async fn poll_long_short_ratio(
        &self,
        symbol: &str,
    ) -> Result<LongShortRatioRecord, IngestError> {
        let entries: Vec<LongShortEntry> = self
            .rest
            .get_json(
                "/futures/data/globalLongShortAccountRatio",
                &[("symbol", symbol), ("period", "5m"), ("limit", "1")],
            )
            .await?;

        let entry = entries
            .into_iter()
            .next_back()
            .ok_or_else(|| IngestError::Parse(format!("empty long/short list for {symbol}")))?;

        Ok(LongShortRatioRecord::new(
            Exchange::Binance,
            entry.symbol,
            entry.long_account,
            entry.short_account,
            Some(entry.long_short_ratio),
            Utc::now(),
        ))
    }
}
