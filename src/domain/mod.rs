//! Core domain types and pure analysis logic.
//!
//! Everything here is transport-agnostic: normalized metric records keyed
//! per exchange/symbol, and snapshot analysis functions with no side effects.

pub mod analysis;
pub mod metrics;
