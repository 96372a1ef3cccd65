//! Ports — interfaces between the ingestion core and exchange transports.

pub mod exchange;
