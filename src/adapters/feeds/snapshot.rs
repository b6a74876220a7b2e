//! Snapshot Feeds - JSON Files Standing In for Network Clients
//!
//! `SnapshotOddsFeed` and `SnapshotMarketFeed` read a JSON array of
//! quotes from disk. Whatever process maintains those files (a scraper,
//! a replay tool, a test fixture) becomes the data source. The market
//! snapshot is cached and only re-parsed when the file's modification
//! time changes, since it is queried once per event per cycle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::domain::trade::{EventId, MarketQuote, OddsQuote};
use crate::ports::market_feed::MarketFeed;
use crate::ports::odds_feed::OddsFeed;

/// Parse a JSON array, skipping elements that fail to deserialize.
fn parse_lenient<T: DeserializeOwned>(path: &Path, content: &str) -> Result<Vec<T>> {
  let raw: Vec<serde_json::Value> = serde_json::from_str(content)
    .with_context(|| format!("Snapshot is not a JSON array: {}", path.display()))?;

  let mut items = Vec::with_capacity(raw.len());
  for (i, value) in raw.into_iter().enumerate() {
    match serde_json::from_value::<T>(value) {
      Ok(item) => items.push(item),
      Err(e) => warn!(
        file = %path.display(),
        index = i,
        error = %e,
        "Skipping malformed snapshot record"
      ),
    }
  }
  Ok(items)
}

/// Odds feed backed by a JSON snapshot file.
pub struct SnapshotOddsFeed {
  path: PathBuf,
}

impl SnapshotOddsFeed {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }
}

#[async_trait]
impl OddsFeed for SnapshotOddsFeed {
  #[instrument(skip(self), fields(file = %self.path.display()))]
  async fn fetch_odds(&self) -> Result<Vec<OddsQuote>> {
    let content = fs::read_to_string(&self.path)
      .await
      .with_context(|| format!("Failed to read odds snapshot: {}", self.path.display()))?;
    let quotes = parse_lenient::<OddsQuote>(&self.path, &content)?;
    debug!(count = quotes.len(), "Odds snapshot loaded");
    Ok(quotes)
  }
}

#[derive(Default)]
struct MarketCache {
  modified: Option<SystemTime>,
  by_event: HashMap<EventId, MarketQuote>,
}

/// Market feed backed by a JSON snapshot file.
///
/// When several quotes share an event, the most recent one wins.
pub struct SnapshotMarketFeed {
  path: PathBuf,
  cache: RwLock<MarketCache>,
}

impl SnapshotMarketFeed {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      cache: RwLock::new(MarketCache::default()),
    }
  }

  /// Re-parse the snapshot if it changed since the last load.
  async fn refresh(&self) -> Result<()> {
    let modified = fs::metadata(&self.path)
      .await
      .with_context(|| format!("Failed to stat market snapshot: {}", self.path.display()))?
      .modified()
      .ok();

    if modified.is_some() && self.cache.read().await.modified == modified {
      return Ok(());
    }

    let content = fs::read_to_string(&self.path)
      .await
      .with_context(|| format!("Failed to read market snapshot: {}", self.path.display()))?;
    let quotes = parse_lenient::<MarketQuote>(&self.path, &content)?;

    let mut by_event: HashMap<EventId, MarketQuote> = HashMap::new();
    for quote in quotes {
      match by_event.get(&quote.event_id) {
        Some(existing) if existing.timestamp > quote.timestamp => {}
        _ => {
          by_event.insert(quote.event_id.clone(), quote);
        }
      }
    }

    debug!(events = by_event.len(), "Market snapshot reloaded");
    let mut cache = self.cache.write().await;
    cache.modified = modified;
    cache.by_event = by_event;
    Ok(())
  }
}

#[async_trait]
impl MarketFeed for SnapshotMarketFeed {
  async fn fetch_quote(&self, event_id: &str) -> Result<Option<MarketQuote>> {
    self.refresh().await?;
    Ok(self.cache.read().await.by_event.get(event_id).cloned())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  fn temp_file(name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hodge-vegas-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
  }

  #[tokio::test]
  async fn test_odds_snapshot_skips_malformed() {
    let good = OddsQuote {
      event_id: "NBA-BOS-NYK".into(),
      side_a: "BOS".into(),
      side_b: "NYK".into(),
      moneyline_a: Some(-150.0),
      moneyline_b: Some(130.0),
      spread: -3.5,
      timestamp: Utc::now(),
      source: "book".into(),
    };
    let json = format!("[{}, {{\"event_id\": 7}}]", serde_json::to_string(&good).unwrap());
    let feed = SnapshotOddsFeed::new(temp_file("odds.json", &json));
    let quotes = feed.fetch_odds().await.unwrap();
    assert_eq!(quotes, vec![good]);
  }

  #[tokio::test]
  async fn test_missing_snapshot_is_error() {
    let feed = SnapshotOddsFeed::new("/nonexistent/odds.json");
    assert!(feed.fetch_odds().await.is_err());
  }

  #[tokio::test]
  async fn test_market_snapshot_latest_wins() {
    let now = Utc::now();
    let older = MarketQuote {
      contract_id: "KX-GSW".into(),
      event_id: "NBA-LAL-GSW".into(),
      outcome: "GSW".into(),
      best_bid: 0.50,
      best_ask: 0.52,
      available_size: 100.0,
      timestamp: now - chrono::Duration::seconds(10),
    };
    let newer = MarketQuote {
      best_ask: 0.55,
      timestamp: now,
      ..older.clone()
    };
    let json = serde_json::to_string(&vec![newer.clone(), older]).unwrap();
    let feed = SnapshotMarketFeed::new(temp_file("markets.json", &json));

    assert_eq!(feed.fetch_quote("NBA-LAL-GSW").await.unwrap(), Some(newer));
    assert_eq!(feed.fetch_quote("NBA-BOS-NYK").await.unwrap(), None);
  }
}
