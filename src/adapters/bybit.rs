//! Bybit linear perpetuals adapter (v5 public API).
//!
//! Streaming: single public endpoint, explicit subscribe handshake with
//! `openInterest.{SYMBOL}` topics. Polling: `/v5/market/open-interest`,
//! `/v5/market/tickers` (funding), and `/v5/market/account-ratio`.

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

/// Inbound frame: either a topic-tagged data push or a subscribe ack.
#[derive(Debug, Deserialize)]
struct StreamFrame {
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenInterestItem {
    #[serde(default)]
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

/// v5 REST envelope: `retCode` 0 means success.
#[derive(Debug, Deserialize)]
struct V5Response<T> {
    #[serde(rename = "retCode")]
    ret_code: i64,
    #[serde(rename = "retMsg", default)]
    ret_msg: String,
    #[serde(default = "empty_result")]
    result: V5Result<T>,
}

#[derive(Debug, Deserialize)]
struct V5Result<T> {
    #[serde(default = "Vec::new")]
    list: Vec<T>,
}

fn empty_result<T>() -> V5Result<T> {
    V5Result { list: Vec::new() }
}

#[derive(Debug, Deserialize)]
struct RestOpenInterestItem {
    #[serde(rename = "openInterest", deserialize_with = "de_flexible_f64")]
    open_interest: f64,
}

#[derive(Debug, Deserialize)]
struct TickerItem {
    symbol: String,
    #[serde(rename = "fundingRate", deserialize_with = "de_flexible_f64")]
    funding_rate: f64,
    #[serde(
        rename = "nextFundingTime",
        default,
        deserialize_with = "de_opt_flexible_u64"
    )]
    next_funding_time: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AccountRatioItem {
    symbol: String,
    #[serde(rename = "buyRatio", deserialize_with = "de_flexible_f64")]
    buy_ratio: f64,
    #[serde(rename = "sellRatio", deserialize_with = "de_flexible_f64")]
    sell_ratio: f64,
}

/// Bybit exchange adapter.
pub struct BybitAdapter {
    display_name: String,
    ws_url: String,
    symbols: Vec<String>,
    rest: RestClient,
}

impl BybitAdapter {
    pub fn new(config: &ExchangeConfig, timeout: Duration) -> Result<Self, IngestError> {
        Ok(Self {
            display_name: config.display_name.clone(),
            ws_url: config.ws_url.clone(),
            symbols: config.symbols.clone(),
            rest: RestClient::new(&config.rest_url, timeout)?,
        })
    }

    fn check_ret_code<T>(response: V5Response<T>) -> Result<Vec<T>, IngestError> {
        if response.ret_code != 0 {
            return Err(IngestError::Transport(format!(
                "bybit retCode {}: {}",
                response.ret_code, response.ret_msg
            )));
        }
        Ok(response.result.list)
    }
}

#[async_trait]
impl ExchangeAdapter for BybitAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::Bybit
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
        let args: Vec<String> = self
            .symbols
            .iter()
            .map(|s| format!("openInterest.{s}"))
            .collect();
        Some(json!({ "op": "subscribe", "args": args }).to_string())
    }

    fn parse_stream_frame(&self, frame: &str) -> Result<Vec<MetricUpdate>, IngestError> {
        let frame: StreamFrame = serde_json::from_str(frame)?;

        // Subscribe acks and heartbeats carry no topic.
        let Some(topic) = frame.topic else {
            return Ok(Vec::new());
        };
        let Some(topic_symbol) = topic.strip_prefix("openInterest.") else {
            return Ok(Vec::new());
        };

        // Data arrives as an array of items or a single object.
        let items: Vec<OpenInterestItem> = match frame.data {
            serde_json::Value::Array(_) => serde_json::from_value(frame.data)?,
            serde_json::Value::Object(_) => vec![serde_json::from_value(frame.data)?],
            _ => Vec::new(),
        };

        Ok(items
            .into_iter()
            .map(|item| {
                let symbol = if item.symbol.is_empty() {
                    topic_symbol.to_string()
                } else {
                    item.symbol
                };
                MetricUpdate::OpenInterest(OpenInterestRecord::new(
                    Exchange::Bybit,
                    symbol,
                    item.open_interest,
                    item.open_interest_value.unwrap_or(0.0),
                    Utc::now(),
                ))
            })
            .collect())
    }

    async fn poll_open_interest(
        &self,
        symbol: &str,
    ) -> Result<OpenInterestRecord, IngestError> {
        let response: V5Response<RestOpenInterestItem> = self
            .rest
            .get_json(
                "/v5/market/open-interest",
                &[("category", "linear"), ("symbol", symbol), ("limit", "1")],
            )
            .await?;

        let item = Self::check_ret_code(response)?
            .into_iter()
            .next()
            .ok_or_else(|| IngestError::Parse(format!("empty open interest list for {symbol}")))?;

        // The open-interest endpoint reports contracts only; notional comes
        // from the stream.
        Ok(OpenInterestRecord::new(
            Exchange::Bybit,
            symbol,
            item.open_interest,
            0.0,
            Utc::now(),
        ))
    }

    async fn poll_funding_rate(&self, symbol: &str) -> Result<FundingRateRecord, IngestError> {
        let response: V5Response<TickerItem> = self
            .rest
            .get_json(
                "/v5/market/tickers",
                &[("category", "linear"), ("symbol", symbol)],
            )
            .await?;

        let item = Self::check_ret_code(response)?
            .into_iter()
            .next()
            .ok_or_else(|| IngestError::Parse(format!("empty ticker list for {symbol}")))?;

        Ok(FundingRateRecord::new(
            Exchange::Bybit,
            item.symbol,
            item.funding_rate,
            item.next_funding_time.unwrap_or(0),
            Utc::now(),
        ))
    }

    async fn poll_long_short_ratio(
        &self,
        symbol: &str,
    ) -> Result<LongShortRatioRecord, IngestError> {
        let response: V5Response<AccountRatioItem> = self
            .rest
            .get_json(
                "/v5/market/account-ratio",
                &[
                    ("category", "linear"),
                    ("symbol", symbol),
                    ("period", "5min"),
                    ("limit", "1"),
                ],
            )
            .await?;

        let item = Self::check_ret_code(response)?
            .into_iter()
            .next()
            .ok_or_else(|| IngestError::Parse(format!("empty account ratio list for {symbol}")))?;

        Ok(LongShortRatioRecord::new(
            Exchange::Bybit,
            item.symbol,
            item.buy_ratio,
            item.sell_ratio,
            None,
            Utc::now(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> BybitAdapter {
        let config = ExchangeConfig {
            id: "bybit".to_string(),
            display_name: "Bybit".to_string(),
            ws_url: "wss://stream.bybit.com/v5/public/linear".to_string(),
            rest_url: "https://api.bybit.com".to_string(),
            symbols: vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()],
        };
        BybitAdapter::new(&config, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn subscribe_payload_lists_topics() {
        let payload = adapter().subscribe_payload().unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["op"], "subscribe");
        assert_eq!(value["args"][0], "openInterest.BTCUSDT");
        assert_eq!(value["args"][1], "openInterest.ETHUSDT");
    }

    #[test]
    fn parses_array_data_frame() {
        let frame = r#"{"topic":"openInterest.BTCUSDT","data":[{"symbol":"BTCUSDT","openInterest":"60000","openInterestValue":"3000000000"}]}"#;
        let updates = adapter().parse_stream_frame(frame).unwrap();
        assert_eq!(updates.len(), 1);

        let MetricUpdate::OpenInterest(record) = &updates[0] else {
            panic!("expected open interest update");
        };
        assert_eq!(record.exchange, Exchange::Bybit);
        assert_eq!(record.quantity, 60_000.0);
        assert_eq!(record.notional_value, 3_000_000_000.0);
    }

    #[test]
    fn symbol_falls_back_to_topic_suffix() {
        let frame =
            r#"{"topic":"openInterest.ETHUSDT","data":{"openInterest":"12.5"}}"#;
        let updates = adapter().parse_stream_frame(frame).unwrap();
        let MetricUpdate::OpenInterest(record) = &updates[0] else {
            panic!("expected open interest update");
        };
        assert_eq!(record.symbol, "ETHUSDT");
    }

    #[test]
    fn subscribe_ack_is_ignored() {
        let frame = r#"{"success":true,"op":"subscribe","conn_id":"abc"}"#;
        let updates = adapter().parse_stream_frame(frame).unwrap();
        assert!(updates.is_empty());
    }
}
