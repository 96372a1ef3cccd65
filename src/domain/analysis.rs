//! Snapshot analysis over the current metric store contents.
//!
//! Pure functions: totals, averages, trend classification against an epsilon
//! band, and a per-record sentiment tally. All O(n) over the snapshot with
//! no side effects.

use serde::Serialize;

use super::metrics::{FundingRateRecord, LongShortRatioRecord, OpenInterestRecord};

/// Default funding-rate epsilon band for trend/sentiment classification.
///
/// Configurable via `[analysis] trend_epsilon`; the comparison is strict, so
/// an average exactly at the boundary classifies as neutral.
pub const DEFAULT_TREND_EPSILON: f64 = 0.0001;

/// Overall market direction derived from funding rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketTrend {
    Bullish,
    Bearish,
    Neutral,
}

impl std::fmt::Display for MarketTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => f.write_str("bullish"),
            Self::Bearish => f.write_str("bearish"),
            Self::Neutral => f.write_str("neutral"),
        }
    }
}

/// Aggregate summary over one store snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAnalysis {
    /// Sum of open-interest notional values across all records.
    pub total_open_interest: f64,
    /// Arithmetic mean funding rate (0 when no records).
    pub total_funding_rate: f64,
    /// Arithmetic mean long/short ratio (0 when no records).
    pub average_long_short_ratio: f64,
    pub market_trend: MarketTrend,
}

/// Per-record funding-rate sentiment buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentimentTally {
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
    pub total: usize,
    pub overall: MarketTrend,
}

/// Classify a single rate against the epsilon band (strict comparisons).
fn classify(rate: f64, epsilon: f64) -> MarketTrend {
    if rate > epsilon {
        MarketTrend::Bullish
    } else if rate < -epsilon {
        MarketTrend::Bearish
    } else {
        MarketTrend::Neutral
    }
}

/// Compute the aggregate market summary over a store snapshot.
pub fn analyze(
    open_interest: &[OpenInterestRecord],
    funding_rates: &[FundingRateRecord],
    long_short: &[LongShortRatioRecord],
    epsilon: f64,
) -> MarketAnalysis {
    let total_open_interest: f64 = open_interest.iter().map(|r| r.notional_value).sum();

    let total_funding_rate = if funding_rates.is_empty() {
        0.0
    } else {
        funding_rates.iter().map(|r| r.rate).sum::<f64>() / funding_rates.len() as f64
    };

    let average_long_short_ratio = if long_short.is_empty() {
        0.0
    } else {
        long_short.iter().map(|r| r.ratio).sum::<f64>() / long_short.len() as f64
    };

    MarketAnalysis {
        total_open_interest,
        total_funding_rate,
        average_long_short_ratio,
        market_trend: classify(total_funding_rate, epsilon),
    }
}

/// Tally funding-rate records into sentiment buckets.
///
/// The overall sentiment requires a strict majority (more than both other
/// buckets); ties resolve to neutral.
pub fn sentiment(funding_rates: &[FundingRateRecord], epsilon: f64) -> SentimentTally {
    let mut bullish = 0;
    let mut bearish = 0;
    let mut neutral = 0;

    for record in funding_rates {
        match classify(record.rate, epsilon) {
            MarketTrend::Bullish => bullish += 1,
            MarketTrend::Bearish => bearish += 1,
            MarketTrend::Neutral => neutral += 1,
        }
    }

    let overall = if bullish > bearish && bullish > neutral {
        MarketTrend::Bullish
    } else if bearish > bullish && bearish > neutral {
        MarketTrend::Bearish
    } else {
        MarketTrend::Neutral
    };

    SentimentTally {
        bullish,
        bearish,
        neutral,
        total: funding_rates.len(),
        overall,
    }
}
