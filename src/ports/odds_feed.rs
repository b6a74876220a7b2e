//! Odds Feed Port - Bookmaker Odds Interface
//!
//! Defines the trait for pulling the current set of bookmaker quotes
//! once per scan cycle. Transport (REST polling, snapshot files,
//! scraping) is an adapter concern.

use async_trait::async_trait;

use crate::domain::trade::OddsQuote;

/// Trait for bookmaker odds providers.
///
/// Called once at the start of every cycle. The engine bounds the call
/// with its own timeout, so implementors need not.
#[async_trait]
pub trait OddsFeed: Send + Sync + 'static {
  /// Fetch every quote currently on offer.
  ///
  /// Several quotes for the same event (different books) are allowed;
  /// the graph pools them.
  ///
  /// # Errors
  /// Returns error if the source is unreachable or its payload is malformed.
  async fn fetch_odds(&self) -> anyhow::Result<Vec<OddsQuote>>;
}
