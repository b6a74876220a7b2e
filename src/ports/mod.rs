//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the use cases require from
//! the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `OddsFeed`: Bookmaker odds, pulled once per cycle
//! - `MarketFeed`: Exchange top of book, per event
//! - `OrderExecution`: Order intent submission

pub mod execution;
pub mod market_feed;
pub mod odds_feed;

pub use execution::{OrderExecution, SubmissionReport};
pub use market_feed::MarketFeed;
pub use odds_feed::OddsFeed;
