//! Market Feed Port - Exchange Top-of-Book Interface
//!
//! Defines the trait for reading the current best bid/ask of the
//! binary contract listed on an event.

use async_trait::async_trait;

use crate::domain::trade::MarketQuote;

/// Trait for exchange market data providers.
///
/// The engine calls `fetch_quote` concurrently for every priced event
/// and bounds each call with its own timeout, so one slow contract
/// never holds up the others.
#[async_trait]
pub trait MarketFeed: Send + Sync + 'static {
  /// Current top of book for the contract listed on `event_id`.
  ///
  /// Returns `Ok(None)` when the exchange lists no contract for the event.
  ///
  /// # Errors
  /// Returns error if the exchange cannot be reached.
  async fn fetch_quote(&self, event_id: &str) -> anyhow::Result<Option<MarketQuote>>;
}
