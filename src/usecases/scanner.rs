//! Opportunity Scanner - Fair Value vs Market Price
//!
//! Pairs each event's fair value with its exchange quote, applies the
//! freshness, sanity, liquidity and ROI filters in that order, and
//! tags survivors with a recommended action for the current regime.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::StrategyConfig;
use crate::domain::decision::{Thresholds, classify};
use crate::domain::error::{PricingError, PricingResult};
use crate::domain::gaussian::FairValueEstimate;
use crate::domain::opportunity::{self, Opportunity};
use crate::domain::regime::Regime;
use crate::domain::trade::MarketQuote;

/// Result of scanning one cycle's events.
#[derive(Debug, Default)]
pub struct ScanOutcome {
  /// Opportunities that passed every filter, action assigned.
  pub opportunities: Vec<Opportunity>,
  /// Events skipped with a per-event error.
  pub skipped: Vec<PricingError>,
  /// Events that priced cleanly but fell below `min_roi`.
  pub below_min_roi: usize,
}

/// Stateless scanner configured once at startup.
#[derive(Debug, Clone)]
pub struct OpportunityScanner {
  freshness_window: Duration,
  min_liquidity_depth: f64,
  taker_fee: f64,
  min_roi: f64,
  thresholds: Thresholds,
}

impl OpportunityScanner {
  pub const fn new(
    freshness_window: Duration,
    min_liquidity_depth: f64,
    taker_fee: f64,
    min_roi: f64,
    thresholds: Thresholds,
  ) -> Self {
    Self {
      freshness_window,
      min_liquidity_depth,
      taker_fee,
      min_roi,
      thresholds,
    }
  }

  pub const fn from_config(config: &StrategyConfig) -> Self {
    Self::new(
      config.freshness_window(),
      config.min_liquidity_depth,
      config.taker_fee,
      config.min_roi,
      config.thresholds(),
    )
  }

  /// Evaluate every `(fair value, quote)` pair independently.
  pub fn scan(
    &self,
    pairs: &[(FairValueEstimate, MarketQuote)],
    regime: Regime,
    now: DateTime<Utc>,
  ) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    for (fair, quote) in pairs {
      match self.evaluate(fair, quote, regime, now) {
        Ok(Some(opp)) => outcome.opportunities.push(opp),
        Ok(None) => outcome.below_min_roi += 1,
        Err(e) => outcome.skipped.push(e),
      }
    }
    outcome
  }

  /// Evaluate one event.
  ///
  /// Returns `Ok(None)` when the event prices cleanly but its ROI is
  /// below the configured minimum.
  ///
  /// # Errors
  /// `StaleData`, `Data` or `Liquidity`, checked in that order.
  pub fn evaluate(
    &self,
    fair: &FairValueEstimate,
    quote: &MarketQuote,
    regime: Regime,
    now: DateTime<Utc>,
  ) -> PricingResult<Option<Opportunity>> {
    check_fresh(&fair.event_id, "odds", fair.observed_at, now, self.freshness_window)?;
    check_fresh(&quote.event_id, "market quote", quote.timestamp, now, self.freshness_window)?;

    opportunity::validate_quote(quote)?;

    if quote.available_size < self.min_liquidity_depth {
      return Err(PricingError::Liquidity {
        event_id: quote.event_id.clone(),
        available: quote.available_size,
        required: self.min_liquidity_depth,
      });
    }

    let mut opp = opportunity::evaluate(fair, quote, self.taker_fee)?;
    if opp.roi < self.min_roi {
      debug!(event_id = %opp.event_id, roi = opp.roi, min_roi = self.min_roi, "Below minimum ROI");
      return Ok(None);
    }

    opp.action = classify(opp.edge, regime, &self.thresholds);
    Ok(Some(opp))
  }
}

/// Reject an input older than `window` at `now`.
///
/// # Errors
/// `StaleData` with the observed age.
pub fn check_fresh(
  event_id: &str,
  what: &'static str,
  observed_at: DateTime<Utc>,
  now: DateTime<Utc>,
  window: Duration,
) -> PricingResult<()> {
  let age_ms = now.signed_duration_since(observed_at).num_milliseconds();
  let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
  if age_ms > 0 && age_ms.unsigned_abs() > window_ms {
    return Err(PricingError::StaleData {
      event_id: event_id.to_string(),
      what,
      age_ms,
      window_ms,
    });
  }
  Ok(())
}
