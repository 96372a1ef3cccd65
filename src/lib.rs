//! Open Interest Analyzer — Library Root
//!
//! Re-exports all modules for integration tests and benchmarks.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod feeds;
pub mod ports;
pub mod server;
pub mod store;
