//! Property-based tests for the domain layer and the store write path.

use chrono::Utc;
use proptest::prelude::*;

use oi_analyzer::domain::analysis::{self, DEFAULT_TREND_EPSILON, MarketTrend};
use oi_analyzer::domain::metrics::{
    Exchange, FundingRateRecord, LongShortRatioRecord, MetricKey, MetricUpdate,
    OpenInterestRecord,
};
use oi_analyzer::store::MetricStore;

fn funding(rate: f64) -> FundingRateRecord {
    FundingRateRecord::new(Exchange::Binance, "BTCUSDT", rate, 0, Utc::now())
}

proptest! {
    /// The store always reflects the most recent upsert for a key, whole
    /// record at a time.
    #[test]
    fn store_reflects_last_upsert(
        updates in prop::collection::vec((0.0f64..1e9, 0.0f64..1e12), 1..32)
    ) {
        let store = MetricStore::new();
        for (quantity, notional) in &updates {
            store.upsert(MetricUpdate::OpenInterest(OpenInterestRecord::new(
                Exchange::Binance,
                "BTCUSDT",
                *quantity,
                *notional,
                Utc::now(),
            )));
        }

        let (last_quantity, last_notional) = *updates.last().unwrap();
        let key = MetricKey::new(Exchange::Binance, "BTCUSDT");
        let record = store.get_open_interest(&key).unwrap();
        prop_assert_eq!(record.quantity, last_quantity);
        prop_assert_eq!(record.notional_value, last_notional);
    }

    /// Derived price matches notional / quantity to within relative 1e-9.
    #[test]
    fn derived_price_matches_quotient(
        quantity in 1e-6f64..1e9,
        notional in 1e-6f64..1e12,
    ) {
        let record = OpenInterestRecord::new(
            Exchange::Okx,
            "BTC-USDT-SWAP",
            quantity,
            notional,
            Utc::now(),
        );
        let price = record.derived_price.unwrap();
        let expected = notional / quantity;
        prop_assert!((price - expected).abs() <= expected.abs() * 1e-9);
    }

    /// The reported funding rate is the arithmetic mean and is always finite.
    #[test]
    fn funding_average_is_mean(rates in prop::collection::vec(-0.01f64..0.01, 0..64)) {
        let records: Vec<FundingRateRecord> = rates.iter().copied().map(funding).collect();
        let result = analysis::analyze(&[], &records, &[], DEFAULT_TREND_EPSILON);

        prop_assert!(result.total_funding_rate.is_finite());
        if rates.is_empty() {
            prop_assert_eq!(result.total_funding_rate, 0.0);
            prop_assert_eq!(result.market_trend, MarketTrend::Neutral);
        } else {
            let mean = rates.iter().sum::<f64>() / rates.len() as f64;
            prop_assert!((result.total_funding_rate - mean).abs() < 1e-15);
        }
    }

    /// Trend classification is strict: within the closed epsilon band is
    /// neutral, outside is directional.
    #[test]
    fn trend_respects_epsilon_band(rate in -0.01f64..0.01) {
        let result = analysis::analyze(&[], &[funding(rate)], &[], DEFAULT_TREND_EPSILON);
        let expected = if rate > DEFAULT_TREND_EPSILON {
            MarketTrend::Bullish
        } else if rate < -DEFAULT_TREND_EPSILON {
            MarketTrend::Bearish
        } else {
            MarketTrend::Neutral
        };
        prop_assert_eq!(result.market_trend, expected);
    }

    /// Sentiment buckets partition the records, and the overall call only
    /// goes directional on a strict majority.
    #[test]
    fn sentiment_buckets_partition(rates in prop::collection::vec(-0.001f64..0.001, 0..64)) {
        let records: Vec<FundingRateRecord> = rates.iter().copied().map(funding).collect();
        let tally = analysis::sentiment(&records, DEFAULT_TREND_EPSILON);

        prop_assert_eq!(tally.bullish + tally.bearish + tally.neutral, tally.total);
        prop_assert_eq!(tally.total, rates.len());

        match tally.overall {
            MarketTrend::Bullish => {
                prop_assert!(tally.bullish > tally.bearish && tally.bullish > tally.neutral);
            }
            MarketTrend::Bearish => {
                prop_assert!(tally.bearish > tally.bullish && tally.bearish > tally.neutral);
            }
            MarketTrend::Neutral => {
                prop_assert!(!(tally.bullish > tally.bearish && tally.bullish > tally.neutral));
                prop_assert!(!(tally.bearish > tally.bullish && tally.bearish > tally.neutral));
            }
        }
    }

    /// Long/short validation: records inside [0, 1] are kept, anything
    /// outside is dropped.
    #[test]
    fn long_short_range_enforced(long in -0.5f64..1.5, short in -0.5f64..1.5) {
        let store = MetricStore::new();
        let kept = store.upsert(MetricUpdate::LongShortRatio(LongShortRatioRecord::new(
            Exchange::Bybit,
            "ETHUSDT",
            long,
            short,
            Some(1.0),
            Utc::now(),
        )));

        let in_range = (0.0..=1.0).contains(&long) && (0.0..=1.0).contains(&short);
        prop_assert_eq!(kept, in_range);
    }

    /// Total open interest is the sum of notionals regardless of ordering.
    #[test]
    fn open_interest_total_is_order_independent(
        notionals in prop::collection::vec(0.0f64..1e9, 0..32)
    ) {
        let records: Vec<OpenInterestRecord> = notionals
            .iter()
            .enumerate()
            .map(|(i, n)| {
                OpenInterestRecord::new(Exchange::Binance, format!("SYM{i}"), 1.0, *n, Utc::now())
            })
            .collect();

        let forward = analysis::analyze(&records, &[], &[], DEFAULT_TREND_EPSILON);
        let mut reversed = records;
        reversed.reverse();
        let backward = analysis::analyze(&reversed, &[], &[], DEFAULT_TREND_EPSILON);

        // Same sum evaluated in reverse stays within float tolerance.
        let scale = forward.total_open_interest.abs().max(1.0);
        prop_assert!(
            (forward.total_open_interest - backward.total_open_interest).abs()
                <= scale * 1e-9
        );
    }
}
