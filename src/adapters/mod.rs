//! Exchange adapters — wire-format translation per exchange.
//!
//! Each adapter implements the `ExchangeAdapter` port for one exchange:
//! - Binance: implicit stream subscription via URL path, string-typed numerics
//! - Bybit: explicit subscribe handshake, topic-tagged frames
//! - OKX: explicit subscribe handshake, instId symbol notation, broader set
//!
//! The registry builds adapters from static config; a misconfigured entry
//! disables that adapter only.

pub mod binance;
pub mod bybit;
pub mod okx;
pub mod registry;
pub mod rest;

pub use binance::BinanceAdapter;
pub use bybit::BybitAdapter;
pub use okx::OkxAdapter;

use serde::{Deserialize, Deserializer};

/// Deserialize an f64 that exchanges encode as either a number or a string.
pub(crate) fn de_flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Deserialize an optional f64 that may be a number, a string, or absent.
/// Empty strings map to `None`.
pub(crate) fn de_opt_flexible_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Str(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Num(n)) => Ok(Some(n)),
        Some(Raw::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Str(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Deserialize an optional u64 epoch-ms that may be a number or a string.
pub(crate) fn de_opt_flexible_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Num(n)) => Ok(Some(n)),
        Some(Raw::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Str(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
