//! Concurrent latest-value metric store.
//!
//! One sharded map per metric kind, keyed by `(exchange, symbol)`. Writers
//! (stream subscribers and the poll refresher) submit whole records through
//! [`MetricStore::upsert`]; readers always observe a fully-old or fully-new
//! record because entries are replaced atomically under their shard lock.
//! Records are never deleted; `observed_at` lets callers infer staleness.

use dashmap::DashMap;

use tracing::warn;

use crate::domain::metrics::{
    FundingRateRecord, LongShortRatioRecord, MetricKey, MetricKind, MetricUpdate,
    OpenInterestRecord,
};

/// Shared in-memory cache of the latest record per `(exchange, symbol, kind)`.
#[derive(Debug, Default)]
pub struct MetricStore {
    open_interest: DashMap<MetricKey, OpenInterestRecord>,
    funding_rates: DashMap<MetricKey, FundingRateRecord>,
    long_short: DashMap<MetricKey, LongShortRatioRecord>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the record for the update's key.
    ///
    /// Always succeeds from the caller's perspective; updates that fail
    /// validation (non-finite or out-of-range numeric fields) are dropped
    /// with a warning and never stored. Returns whether the update was kept.
    pub fn upsert(&self, update: MetricUpdate) -> bool {
        if let Err(reason) = validate(&update) {
            let key = update.key();
            warn!(
                exchange = %key.exchange,
                symbol = %key.symbol,
                kind = ?update.kind(),
                %reason,
                "dropping invalid metric update"
            );
            return false;
        }

        match update {
            MetricUpdate::OpenInterest(record) => {
                self.open_interest.insert(record.key(), record);
            }
            MetricUpdate::FundingRate(record) => {
                self.funding_rates.insert(record.key(), record);
            }
            MetricUpdate::LongShortRatio(record) => {
                self.long_short.insert(record.key(), record);
            }
        }
        true
    }

    pub fn get_open_interest(&self, key: &MetricKey) -> Option<OpenInterestRecord> {
        self.open_interest.get(key).map(|r| r.clone())
    }

    pub fn get_funding_rate(&self, key: &MetricKey) -> Option<FundingRateRecord> {
        self.funding_rates.get(key).map(|r| r.clone())
    }

    pub fn get_long_short_ratio(&self, key: &MetricKey) -> Option<LongShortRatioRecord> {
        self.long_short.get(key).map(|r| r.clone())
    }

    /// Unordered snapshot of all open-interest records.
    pub fn open_interest_snapshot(&self) -> Vec<OpenInterestRecord> {
        self.open_interest.iter().map(|r| r.clone()).collect()
    }

    /// Unordered snapshot of all funding-rate records.
    pub fn funding_rate_snapshot(&self) -> Vec<FundingRateRecord> {
        self.funding_rates.iter().map(|r| r.clone()).collect()
    }

    /// Unordered snapshot of all long/short ratio records.
    pub fn long_short_snapshot(&self) -> Vec<LongShortRatioRecord> {
        self.long_short.iter().map(|r| r.clone()).collect()
    }

    pub fn size(&self, kind: MetricKind) -> usize {
        match kind {
            MetricKind::OpenInterest => self.open_interest.len(),
            MetricKind::FundingRate => self.funding_rates.len(),
            MetricKind::LongShortRatio => self.long_short.len(),
        }
    }

    pub fn total_size(&self) -> usize {
        self.open_interest.len() + self.funding_rates.len() + self.long_short.len()
    }
}

/// Reject updates carrying non-finite or out-of-range numeric fields.
fn validate(update: &MetricUpdate) -> Result<(), &'static str> {
    match update {
        MetricUpdate::OpenInterest(r) => {
            if !r.quantity.is_finite() || !r.notional_value.is_finite() {
                return Err("non-finite open interest fields");
            }
            if r.quantity < 0.0 {
                return Err("negative open interest quantity");
            }
        }
        MetricUpdate::FundingRate(r) => {
            if !r.rate.is_finite() {
                return Err("non-finite funding rate");
            }
        }
        MetricUpdate::LongShortRatio(r) => {
            if !r.long_ratio.is_finite() || !r.short_ratio.is_finite() || !r.ratio.is_finite() {
                return Err("non-finite long/short fields");
            }
            if !(0.0..=1.0).contains(&r.long_ratio) || !(0.0..=1.0).contains(&r.short_ratio) {
                return Err("long/short ratio outside [0, 1]");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::Exchange;
    use chrono::Utc;

    fn oi(quantity: f64, notional: f64) -> MetricUpdate {
        MetricUpdate::OpenInterest(OpenInterestRecord::new(
            Exchange::Binance,
            "BTCUSDT",
            quantity,
            notional,
            Utc::now(),
        ))
    }

    #[test]
    fn upsert_overwrites_whole_record() {
        let store = MetricStore::new();
        assert!(store.upsert(oi(100.0, 5_000_000.0)));
        assert!(store.upsert(oi(110.0, 5_500_000.0)));

        let key = MetricKey::new(Exchange::Binance, "BTCUSDT");
        let record = store.get_open_interest(&key).unwrap();
        assert_eq!(record.quantity, 110.0);
        assert_eq!(record.notional_value, 5_500_000.0);
        assert_eq!(record.derived_price, Some(50_000.0));
        assert_eq!(store.size(MetricKind::OpenInterest), 1);
    }

    #[test]
    fn non_finite_updates_are_dropped() {
        let store = MetricStore::new();
        assert!(!store.upsert(oi(f64::NAN, 1.0)));
        assert!(!store.upsert(oi(1.0, f64::INFINITY)));
        assert!(!store.upsert(oi(-5.0, 1.0)));
        assert_eq!(store.size(MetricKind::OpenInterest), 0);
    }

    #[test]
    fn out_of_range_long_short_ratio_is_dropped() {
        let store = MetricStore::new();
        let update = MetricUpdate::LongShortRatio(LongShortRatioRecord::new(
            Exchange::Bybit,
            "ETHUSDT",
            1.4,
            0.4,
            None,
            Utc::now(),
        ));
        assert!(!store.upsert(update));
        assert_eq!(store.size(MetricKind::LongShortRatio), 0);
    }

    #[test]
    fn kinds_are_keyed_independently() {
        let store = MetricStore::new();
        store.upsert(oi(10.0, 100.0));
        store.upsert(MetricUpdate::FundingRate(FundingRateRecord::new(
            Exchange::Binance,
            "BTCUSDT",
            0.0001,
            0,
            Utc::now(),
        )));

        assert_eq!(store.size(MetricKind::OpenInterest), 1);
        assert_eq!(store.size(MetricKind::FundingRate), 1);
        assert_eq!(store.size(MetricKind::LongShortRatio), 0);
        assert_eq!(store.total_size(), 2);
    }
}
