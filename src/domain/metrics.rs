//! Normalized derivatives-market metric records.
//!
//! Every exchange adapter translates its own wire format into these types;
//! the metric store holds exactly one record per `(exchange, symbol, kind)`
//! key, latest-value-wins. Serialized field names follow the public API
//! contract (camelCase).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported derivatives exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Binance,
    Bybit,
    Okx,
}

impl Exchange {
    /// Parse an exchange identifier as it appears in config and URL paths.
    pub fn from_id(id: &str) -> Option<Self> {
        match id.to_ascii_lowercase().as_str() {
            "binance" => Some(Self::Binance),
            "bybit" => Some(Self::Bybit),
            "okx" => Some(Self::Okx),
            _ => None,
        }
    }

    /// Lowercase identifier used in config, store keys, and API paths.
    pub const fn id(self) -> &'static str {
        match self {
            Self::Binance => "binance",
            Self::Bybit => "bybit",
            Self::Okx => "okx",
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// The three metric kinds tracked per exchange/symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    OpenInterest,
    FundingRate,
    LongShortRatio,
}

/// Store index: one record per `(exchange, symbol)` within each kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricKey {
    pub exchange: Exchange,
    pub symbol: String,
}

impl MetricKey {
    pub fn new(exchange: Exchange, symbol: impl Into<String>) -> Self {
        Self {
            exchange,
            symbol: symbol.into(),
        }
    }
}

/// Latest open interest observation for one exchange/symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInterestRecord {
    pub exchange: Exchange,
    pub symbol: String,
    /// Outstanding contracts. Invariant: >= 0.
    pub quantity: f64,
    /// Notional value in quote currency (0 when the exchange omits it).
    pub notional_value: f64,
    /// Estimated price, notional / quantity; `None` when quantity is zero.
    /// An approximation: a real price would come from a market-data feed.
    pub derived_price: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

impl OpenInterestRecord {
    /// Build a record, deriving the price estimate as `notional / quantity`
    /// whenever the quantity is positive (zero notional derives a zero
    /// price). `None` only when the quotient is undefined.
    pub fn new(
        exchange: Exchange,
        symbol: impl Into<String>,
        quantity: f64,
        notional_value: f64,
        observed_at: DateTime<Utc>,
    ) -> Self {
        let derived_price = if quantity > 0.0 {
            Some(notional_value / quantity)
        } else {
            None
        };

        Self {
            exchange,
            symbol: symbol.into(),
            quantity,
            notional_value,
            derived_price,
            observed_at,
        }
    }

    pub fn key(&self) -> MetricKey {
        MetricKey::new(self.exchange, self.symbol.clone())
    }
}

/// Latest funding rate observation for one exchange/symbol.
///
/// The rate is a signed fraction (0.0001 = 0.01%); negative rates mean
/// shorts pay longs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingRateRecord {
    pub exchange: Exchange,
    pub symbol: String,
    pub rate: f64,
    /// Next funding settlement (epoch ms); 0 when the exchange omits it.
    pub next_funding_time: u64,
    pub observed_at: DateTime<Utc>,
}

impl FundingRateRecord {
    pub fn new(
        exchange: Exchange,
        symbol: impl Into<String>,
        rate: f64,
        next_funding_time: u64,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            exchange,
            symbol: symbol.into(),
            rate,
            next_funding_time,
            observed_at,
        }
    }

    pub fn key(&self) -> MetricKey {
        MetricKey::new(self.exchange, self.symbol.clone())
    }
}

/// Latest long/short positioning observation for one exchange/symbol.
///
/// `long_ratio` and `short_ratio` are each in [0, 1] but are sampled
/// independently and need not sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongShortRatioRecord {
    pub exchange: Exchange,
    pub symbol: String,
    pub long_ratio: f64,
    pub short_ratio: f64,
    /// Long/short quotient, exchange-reported or derived.
    pub ratio: f64,
    pub observed_at: DateTime<Utc>,
}

impl LongShortRatioRecord {
    /// Build a record. When `ratio` is `None` it is derived as
    /// `long_ratio / short_ratio` (0 if the short side is empty).
    pub fn new(
        exchange: Exchange,
        symbol: impl Into<String>,
        long_ratio: f64,
        short_ratio: f64,
        ratio: Option<f64>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        let ratio = ratio.unwrap_or(if short_ratio > 0.0 {
            long_ratio / short_ratio
        } else {
            0.0
        });

        Self {
            exchange,
            symbol: symbol.into(),
            long_ratio,
            short_ratio,
            ratio,
            observed_at,
        }
    }

    pub fn key(&self) -> MetricKey {
        MetricKey::new(self.exchange, self.symbol.clone())
    }
}

/// A normalized update produced by an adapter (stream or poll path).
///
/// The metric store is the single consumer; adapters never touch stored
/// records directly.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricUpdate {
    OpenInterest(OpenInterestRecord),
    FundingRate(FundingRateRecord),
    LongShortRatio(LongShortRatioRecord),
}

impl MetricUpdate {
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::OpenInterest(_) => MetricKind::OpenInterest,
            Self::FundingRate(_) => MetricKind::FundingRate,
            Self::LongShortRatio(_) => MetricKind::LongShortRatio,
        }
    }

    pub fn key(&self) -> MetricKey {
        match self {
            Self::OpenInterest(r) => r.key(),
            Self::FundingRate(r) => r.key(),
            Self::LongShortRatio(r) => r.key(),
        }
    }
}
