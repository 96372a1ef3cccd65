//! OKX perpetual swaps adapter (v5 public API).
//!
//! Symbols use OKX instrument notation (`BTC-USDT-SWAP`), and OKX covers the
//! full configured universe — it has no exclusions. Streaming: explicit
//! subscribe handshake on the public channel. Polling:
//! `/api/v5/public/open-interest`, `/api/v5/public/funding-rate`, and the
//! rubik long/short account-ratio statistics.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::config::ExchangeConfig;
use crate::domain::metrics::{
    Exchange, FundingRateRecord, LongShortRatioRecord, MetricUpdate, OpenInterestRecord,
};
use crate::error::IngestError;
use crate::ports::exchange::ExchangeAdapter;

use super::rest::RestClient;
use super::{de_flexible_f64, de_opt_flexible_f64, de_opt_flexible_u64};

/// Inbound frame: event acks carry `event`, data pushes carry `arg` + `data`.
#[derive(Debug, Deserialize)]
struct StreamFrame {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    arg: Option<ChannelArg>,
    #[serde(default)]
    data: Vec<OpenInterestItem>,
}

#[derive(Debug, Deserialize)]
struct ChannelArg {
    channel: String,
}

#[derive(Debug, Deserialize)]
struct OpenInterestItem {
    #[serde(rename = "instId")]
    inst_id: String,
    #[serde(rename = "oi", deserialize_with = "de_flexible_f64")]
    contracts: f64,
    #[serde(rename = "oiCcy", default, deserialize_with = "de_opt_flexible_f64")]
    notional_ccy: Option<f64>,
    #[serde(rename = "oiUsd", default, deserialize_with = "de_opt_flexible_f64")]
    notional_usd: Option<f64>,
}

/// v5 REST envelope: `code` "0" means success.
#[derive(Debug, Deserialize)]
struct V5Response<T> {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct FundingRateItem {
    #[serde(rename = "instId")]
    inst_id: String,
    #[serde(rename = "fundingRate", deserialize_with = "de_flexible_f64")]
    funding_rate: f64,
    #[serde(
        rename = "nextFundingTime",
        default,
        deserialize_with = "de_opt_flexible_u64"
    )]
    next_funding_time: Option<u64>,
}

/// OKX exchange adapter.
pub struct OkxAdapter {
    display_name: String,
    ws_url: String,
    symbols: Vec<String>,
    rest: RestClient,
}

impl OkxAdapter {
    pub fn new(config: &ExchangeConfig, timeout: Duration) -> Result<Self, IngestError> {
        Ok(Self {
            display_name: config.display_name.clone(),
            ws_url: config.ws_url.clone(),
            symbols: config.symbols.clone(),
            rest: RestClient::new(&config.rest_url, timeout)?,
        })
    }

    fn check_code<T>(response: V5Response<T>) -> Result<Vec<T>, IngestError> {
        if response.code != "0" {
            return Err(IngestError::Transport(format!(
                "okx code {}: {}",
                response.code, response.msg
            )));
        }
        Ok(response.data)
    }

    /// Base currency of an instrument id, e.g. "BTC-USDT-SWAP" -> "BTC".
    fn base_currency(inst_id: &str) -> &str {
        inst_id.split('-').next().unwrap_or(inst_id)
    }
}

#[async_trait]
impl ExchangeAdapter for OkxAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::Okx
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn symbols(&self) -> &[String] {
        &self.symbols
    }

    fn stream_url(&self) -> String {
        self.ws_url.clone()
    }

    fn subscribe_payload(&self) -> Option<String> {
        let args: Vec<serde_json::Value> = self
            .symbols
            .iter()
            .map(|inst_id| json!({ "channel": "open-interest", "instId": inst_id }))
            .collect();
        Some(json!({ "op": "subscribe", "args": args }).to_string())
    }

    fn parse_stream_frame(&self, frame: &str) -> Result<Vec<MetricUpdate>, IngestError> {
        let frame: StreamFrame = serde_json::from_str(frame)?;

        // Subscribe/error acks carry an event tag and no data.
        if frame.event.is_some() {
            return Ok(Vec::new());
        }
        match frame.arg {
            Some(arg) if arg.channel == "open-interest" => {}
            _ => return Ok(Vec::new()),
        }

        Ok(frame
            .data
            .into_iter()
            .map(|item| {
                MetricUpdate::OpenInterest(OpenInterestRecord::new(
                    Exchange::Okx,
                    item.inst_id,
                    item.contracts,
                    // Prefer USD notional, fall back to currency notional.
                    item.notional_usd.or(item.notional_ccy).unwrap_or(0.0),
                    Utc::now(),
                ))
            })
            .collect())
    }

    async fn poll_open_interest(
        &self,
        symbol: &str,
    ) -> Result<OpenInterestRecord, IngestError> {
        let response: V5Response<OpenInterestItem> = self
            .rest
            .get_json(
                "/api/v5/public/open-interest",
                &[("instType", "SWAP"), ("instId", symbol)],
            )
            .await?;

        let item = Self::check_code(response)?
            .into_iter()
            .next()
            .ok_or_else(|| IngestError::Parse(format!("empty open interest data for {symbol}")))?;

        Ok(OpenInterestRecord::new(
            Exchange::Okx,
            item.inst_id,
            item.contracts,
            item.notional_usd.or(item.notional_ccy).unwrap_or(0.0),
            Utc::now(),
        ))
    }

    async fn poll_funding_rate(&self, symbol: &str) -> Result<FundingRateRecord, IngestError> {
        let response: V5Response<FundingRateItem> = self
            .rest
            .get_json("/api/v5/public/funding-rate", &[("instId", symbol)])
            .await?;

        let item = Self::check_code(response)?
            .into_iter()
            .next()
            .ok_or_else(|| IngestError::Parse(format!("empty funding rate data for {symbol}")))?;

        Ok(FundingRateRecord::new(
            Exchange::Okx,
            item.inst_id,
            item.funding_rate,
            item.next_funding_time.unwrap_or(0),
            Utc::now(),
        ))
    }

    async fn poll_long_short_ratio(
        &self,
        symbol: &str,
    ) -> Result<LongShortRatioRecord, IngestError> {
        // Rubik statistics report [timestamp, ratio] pairs per currency.
        let response: V5Response<Vec<String>> = self
            .rest
            .get_json(
                "/api/v5/rubik/stat/contracts/long-short-account-ratio",
                &[("ccy", Self::base_currency(symbol)), ("period", "5m")],
            )
            .await?;

        let pair = Self::check_code(response)?
            .into_iter()
            .next()
            .ok_or_else(|| IngestError::Parse(format!("empty long/short data for {symbol}")))?;

        let ratio: f64 = pair
            .get(1)
            .ok_or_else(|| IngestError::Parse("missing ratio column".to_string()))?
            .parse()
            .map_err(|e| IngestError::Parse(format!("bad ratio value: {e}")))?;

        // Only the quotient is reported; decompose it into the component
        // shares so the record satisfies the [0, 1] invariant.
        let long_ratio = ratio / (1.0 + ratio);
        let short_ratio = 1.0 / (1.0 + ratio);

        Ok(LongShortRatioRecord::new(
            Exchange::Okx,
            symbol,
            long_ratio,
            short_ratio,
            Some(ratio),
            Utc::now(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> OkxAdapter {
        let config = ExchangeConfig {
            id: "okx".to_string(),
            display_name: "OKX".to_string(),
            ws_url: "wss://ws.okx.com:8443/ws/v5/public".to_string(),
            rest_url: "https://www.okx.com".to_string(),
            symbols: vec!["BTC-USDT-SWAP".to_string(), "ETH-USDT-SWAP".to_string()],
        };
        OkxAdapter::new(&config, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn subscribe_payload_uses_channel_args() {
        let payload = adapter().subscribe_payload().unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["op"], "subscribe");
        assert_eq!(value["args"][0]["channel"], "open-interest");
        assert_eq!(value["args"][0]["instId"], "BTC-USDT-SWAP");
        assert_eq!(value["args"][1]["instId"], "ETH-USDT-SWAP");
    }

    #[test]
    fn parses_open_interest_push() {
        let frame = r#"{
            "arg": {"channel": "open-interest", "instId": "BTC-USDT-SWAP"},
            "data": [{"instType":"SWAP","instId":"BTC-USDT-SWAP","oi":"1500000","oiCcy":"15000","oiUsd":"750000000","ts":"1700000000000"}]
        }"#;
        let updates = adapter().parse_stream_frame(frame).unwrap();
        assert_eq!(updates.len(), 1);

        let MetricUpdate::OpenInterest(record) = &updates[0] else {
            panic!("expected open interest update");
        };
        assert_eq!(record.symbol, "BTC-USDT-SWAP");
        assert_eq!(record.quantity, 1_500_000.0);
        // USD notional preferred over currency notional.
        assert_eq!(record.notional_value, 750_000_000.0);
    }

    #[test]
    fn subscribe_ack_is_ignored() {
        let frame = r#"{"event":"subscribe","arg":{"channel":"open-interest","instId":"BTC-USDT-SWAP"}}"#;
        let updates = adapter().parse_stream_frame(frame).unwrap();
        assert!(updates.is_empty());
    }

    #[test]
    fn base_currency_extraction() {
        assert_eq!(OkxAdapter::base_currency("BTC-USDT-SWAP"), "BTC");
        assert_eq!(OkxAdapter::base_currency("SOLUSDT"), "SOLUSDT");
    }
}
