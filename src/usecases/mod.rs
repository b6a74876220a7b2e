//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the engine's workflows.
//!
//! Use cases:
//! - `ScanEngine`: Fixed-interval scan cycle, odds to intents
//! - `OpportunityScanner`: Fair value vs market price, with filters
//! - `StrategyEngine`: Intent pricing, sizing and dedup
//! - `EngineContext`: Cross-cycle state (dedup cache, regime history)

pub mod context;
pub mod dedup_cache;
pub mod scan_engine;
pub mod scanner;
pub mod strategy_engine;

pub use context::EngineContext;
pub use dedup_cache::DedupCache;
pub use scan_engine::{CycleReport, ScanEngine};
pub use scanner::{OpportunityScanner, ScanOutcome};
pub use strategy_engine::{NoIntent, StrategyEngine, StrategyOutcome};
