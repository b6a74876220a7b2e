//! Hodge-Vegas - Library Root
//!
//! Gaussian fair-value pricing of bookmaker odds and Hodge-decomposition
//! arbitrage detection for binary sports contracts. Re-exports all
//! modules for the binary, integration tests and benchmarks.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
