//! Engine Context - Process-Wide State
//!
//! The only state that outlives a scan cycle: the dedup cache and the
//! curl-norm history. Created once at startup, torn down at shutdown,
//! and shared by reference; each piece sits behind its own async mutex
//! so writers are serialized.

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::regime::{Regime, RegimeDetector};
use crate::domain::trade::{Fingerprint, OrderStatus};

use super::dedup_cache::DedupCache;

/// Shared state across cycles.
#[derive(Debug)]
pub struct EngineContext {
  dedup: Mutex<DedupCache>,
  regime: Mutex<RegimeDetector>,
}

impl EngineContext {
  /// Build from validated configuration.
  pub fn init(config: &AppConfig) -> Self {
    info!(
      dedup_ttl_ms = config.strategy.dedup_ttl_ms,
      regime_window = config.regime.window,
      "Engine context initialized"
    );
    Self::new(
      DedupCache::new(config.strategy.dedup_ttl()),
      config.regime.build(),
    )
  }

  pub fn new(dedup: DedupCache, regime: RegimeDetector) -> Self {
    Self {
      dedup: Mutex::new(dedup),
      regime: Mutex::new(regime),
    }
  }

  /// Feed a successful decomposition's curl norm to the detector.
  pub async fn observe_curl(&self, curl_norm: f64) -> Regime {
    self.regime.lock().await.observe(curl_norm)
  }

  /// Regime for a cycle whose decomposition failed.
  pub async fn degrade_regime(&self) -> Regime {
    self.regime.lock().await.degrade()
  }

  /// Atomic check-and-record; `true` when the intent may be emitted.
  pub async fn try_claim(&self, fingerprint: &Fingerprint, now: DateTime<Utc>) -> bool {
    self.dedup.lock().await.try_insert(fingerprint, now)
  }

  /// Apply an execution outcome to the cached fingerprint.
  pub async fn record_outcome(&self, fingerprint: &Fingerprint, status: OrderStatus) {
    if let Err(e) = self.dedup.lock().await.mark(fingerprint, status) {
      warn!(fingerprint = %fingerprint, error = %e, "Ignoring out-of-order execution report");
    }
  }

  /// Evict entries past the TTL, returning what was evicted.
  pub async fn evict_expired(&self, now: DateTime<Utc>) -> Vec<(Fingerprint, OrderStatus)> {
    self.dedup.lock().await.evict_expired(now)
  }

  pub async fn dedup_len(&self) -> usize {
    self.dedup.lock().await.len()
  }

  pub async fn regime_history_len(&self) -> usize {
    self.regime.lock().await.len()
  }

  /// Tear down, logging any intent still awaiting an outcome.
  pub async fn shutdown(&self) -> usize {
    let open = self.dedup.lock().await.drain_open();
    for fp in &open {
      warn!(fingerprint = %fp, "Intent still open at shutdown");
    }
    info!(open_intents = open.len(), "Engine context shut down");
    open.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::trade::Side;
  use rust_decimal_macros::dec;
  use std::time::Duration;

  fn ctx() -> EngineContext {
    EngineContext::new(
      DedupCache::new(Duration::from_secs(60)),
      RegimeDetector::new(20, 2.0, 5),
    )
  }

  #[tokio::test]
  async fn test_claim_is_exclusive() {
    let ctx = ctx();
    let fp = Fingerprint {
      event_id: "e".into(),
      price: dec!(0.5),
      side: Side::Yes,
    };
    let now = Utc::now();
    assert!(ctx.try_claim(&fp, now).await);
    assert!(!ctx.try_claim(&fp, now).await);
    assert_eq!(ctx.shutdown().await, 1);
    assert_eq!(ctx.dedup_len().await, 0);
  }

  #[tokio::test]
  async fn test_degrade_does_not_grow_history() {
    let ctx = ctx();
    ctx.observe_curl(1.0).await;
    assert_eq!(ctx.degrade_regime().await, Regime::Conservative);
    assert_eq!(ctx.regime_history_len().await, 1);
  }
}
