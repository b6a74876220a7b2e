//! Feed Adapters
//!
//! File-snapshot implementations of the `OddsFeed` and `MarketFeed`
//! ports.

pub mod snapshot;

pub use snapshot::{SnapshotMarketFeed, SnapshotOddsFeed};
