//! Scan Engine - One Pricing Cycle, Repeated
//!
//! Each cycle:
//! 1. Fetches bookmaker odds (bounded by `fetch_timeout`)
//! 2. Normalizes and prices every event independently
//! 3. Builds the market graph, decomposes it, updates the regime
//! 4. Fetches exchange quotes for priced events concurrently
//! 5. Scans for opportunities and turns them into deduplicated intents
//! 6. Dispatches intents to execution, or only logs them in dry-run
//!
//! Per-event failures are logged, counted and skipped; nothing short
//! of shutdown stops the loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::config::AppConfig;
use crate::domain::decision::Action;
use crate::domain::error::PricingError;
use crate::domain::gaussian::{FairValueEstimate, GaussianModel};
use crate::domain::graph::MarketGraph;
use crate::domain::hodge::HodgeSolver;
use crate::domain::odds;
use crate::domain::regime::Regime;
use crate::domain::trade::{EventId, Fingerprint, MarketQuote, OddsQuote, OrderIntent, OrderStatus};
use crate::ports::execution::OrderExecution;
use crate::ports::market_feed::MarketFeed;
use crate::ports::odds_feed::OddsFeed;

use super::context::EngineContext;
use super::scanner::{OpportunityScanner, check_fresh};
use super::strategy_engine::StrategyEngine;

/// Summary of one cycle, consumed by logging and metrics.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
  pub started_at: DateTime<Utc>,
  /// Whether the odds fetch returned in time.
  pub odds_fetched: bool,
  pub quotes_received: usize,
  /// Events with a fair value this cycle.
  pub events_priced: usize,
  pub graph_nodes: usize,
  pub graph_edges: usize,
  /// `None` when the decomposition failed.
  pub curl_norm: Option<f64>,
  pub regime: Regime,
  /// Opportunities per recommended action.
  pub opportunities: HashMap<Action, usize>,
  /// Intents emitted after dedup.
  pub intents: Vec<OrderIntent>,
  /// Intents accepted by execution.
  pub submitted: usize,
  /// Intents explicitly rejected by the venue.
  pub rejected: usize,
  /// Submissions that timed out or failed in transport. Their
  /// fingerprints stay live until the TTL or a late report.
  pub unconfirmed: usize,
  /// Intents suppressed by the dedup cache.
  pub suppressed: usize,
  /// Fingerprints evicted from the dedup cache at cycle start.
  pub evicted: usize,
  /// Per-event errors that skipped an event.
  pub errors: Vec<PricingError>,
  pub elapsed: Duration,
}

impl CycleReport {
  fn empty(started_at: DateTime<Utc>) -> Self {
    Self {
      started_at,
      ..Self::default()
    }
  }

  /// Skipped events per error kind.
  pub fn errors_by_kind(&self) -> HashMap<&'static str, usize> {
    let mut counts = HashMap::new();
    for e in &self.errors {
      *counts.entry(e.kind()).or_insert(0) += 1;
    }
    counts
  }
}

/// Drives scan cycles against the three ports.
pub struct ScanEngine<O: OddsFeed, M: MarketFeed, E: OrderExecution> {
  odds_feed: Arc<O>,
  market_feed: Arc<M>,
  execution: Arc<E>,
  ctx: Arc<EngineContext>,
  model: GaussianModel,
  solver: HodgeSolver,
  scanner: OpportunityScanner,
  strategy: StrategyEngine,
  dry_run: bool,
  fetch_timeout: Duration,
  freshness_window: Duration,
  scan_interval: Duration,
}

impl<O: OddsFeed, M: MarketFeed, E: OrderExecution> ScanEngine<O, M, E> {
  /// Create a new scan engine.
  pub fn new(
    odds_feed: Arc<O>,
    market_feed: Arc<M>,
    execution: Arc<E>,
    ctx: Arc<EngineContext>,
    config: &AppConfig,
  ) -> Self {
    Self {
      odds_feed,
      market_feed,
      execution,
      ctx,
      model: config.model.build(),
      solver: HodgeSolver::new(config.solver.solver_config()),
      scanner: OpportunityScanner::from_config(&config.strategy),
      strategy: StrategyEngine::from_config(&config.strategy),
      dry_run: config.engine.dry_run,
      fetch_timeout: config.engine.fetch_timeout(),
      freshness_window: config.strategy.freshness_window(),
      scan_interval: config.engine.scan_interval(),
    }
  }

  pub fn context(&self) -> &Arc<EngineContext> {
    &self.ctx
  }

  /// Run cycles on a fixed interval until shutdown.
  ///
  /// `on_cycle` sees every report (metrics, health).
  #[instrument(skip_all, name = "scan_loop")]
  pub async fn run<F>(
    &self,
    mut shutdown_rx: broadcast::Receiver<()>,
    mut on_cycle: F,
  ) -> anyhow::Result<()>
  where
    F: FnMut(&CycleReport) + Send,
  {
    info!(
      interval_ms = self.scan_interval.as_millis() as u64,
      dry_run = self.dry_run,
      "Starting scan engine"
    );

    let mut ticker = tokio::time::interval(self.scan_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
      tokio::select! {
        _ = shutdown_rx.recv() => {
          info!("Shutdown signal received, stopping scan engine");
          break;
        }
        _ = ticker.tick() => {
          let report = self.run_cycle(Utc::now()).await;
          on_cycle(&report);
        }
      }
    }

    self.ctx.shutdown().await;
    Ok(())
  }

  /// Execute one full cycle at cycle clock `now`.
  #[instrument(skip(self), fields(cycle_at = %now))]
  pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleReport {
    let start = Instant::now();
    let mut report = CycleReport::empty(now);

    for (fp, status) in self.ctx.evict_expired(now).await {
      debug!(fingerprint = %fp, ?status, "Dedup entry evicted");
      report.evicted += 1;
    }

    // 1. Odds
    let quotes = match tokio::time::timeout(self.fetch_timeout, self.odds_feed.fetch_odds()).await {
      Ok(Ok(quotes)) => quotes,
      Ok(Err(e)) => {
        warn!(error = %e, "Odds fetch failed, cycle skipped");
        return self.finish(report, start);
      }
      Err(_) => {
        warn!(timeout_ms = self.fetch_timeout.as_millis() as u64, "Odds fetch timed out, cycle skipped");
        return self.finish(report, start);
      }
    };
    report.odds_fetched = true;
    report.quotes_received = quotes.len();

    // 2. Fair values
    let estimates = self.price_events(&quotes, now, &mut report.errors);
    let latest = latest_per_event(&estimates);
    report.events_priced = latest.len();

    // 3. Graph and regime
    let regime = self.update_regime(&estimates, &mut report).await;
    report.regime = regime;

    // 4. Exchange quotes
    let pairs = self.fetch_market_quotes(latest, &mut report.errors).await;

    // 5. Scan and decide
    let scan = self.scanner.scan(&pairs, report.regime, now);
    report.errors.extend(scan.skipped);
    for opp in &scan.opportunities {
      *report.opportunities.entry(opp.action).or_insert(0) += 1;
    }

    let decided = self.strategy.decide(&scan.opportunities, &self.ctx, now).await;
    report.suppressed = decided.suppressed;

    // 6. Dispatch
    if self.dry_run {
      for intent in &decided.intents {
        info!(
          intent_id = %intent.id,
          event_id = %intent.event_id,
          style = intent.style.label(),
          price = %intent.price,
          size = intent.size,
          "Dry run: intent logged, not submitted"
        );
      }
    } else {
      let outcome = self.dispatch(&decided.intents).await;
      report.submitted = outcome.accepted;
      report.rejected = outcome.rejected;
      report.unconfirmed = outcome.unconfirmed;
    }
    report.intents = decided.intents;

    for e in &report.errors {
      warn!(kind = e.kind(), error = %e, "Event skipped");
    }
    self.finish(report, start)
  }

  /// Apply a fill / cancel report from the execution collaborator.
  pub async fn on_execution_report(&self, fingerprint: &Fingerprint, status: OrderStatus) {
    self.ctx.record_outcome(fingerprint, status).await;
  }

  fn finish(&self, mut report: CycleReport, start: Instant) -> CycleReport {
    report.elapsed = start.elapsed();
    info!(
      quotes = report.quotes_received,
      priced = report.events_priced,
      regime = %report.regime,
      curl_norm = report.curl_norm,
      intents = report.intents.len(),
      suppressed = report.suppressed,
      skipped = report.errors.len(),
      latency_us = report.elapsed.as_micros() as u64,
      "Cycle complete"
    );
    report
  }

  /// Normalize and price every quote; failures are collected, not raised.
  fn price_events(
    &self,
    quotes: &[OddsQuote],
    now: DateTime<Utc>,
    errors: &mut Vec<PricingError>,
  ) -> Vec<FairValueEstimate> {
    quotes
      .iter()
      .filter_map(|q| {
        let priced = check_fresh(&q.event_id, "odds", q.timestamp, now, self.freshness_window)
          .and_then(|()| odds::normalize(q))
          .and_then(|n| {
            debug!(event_id = %n.event_id, overround = n.overround, "Odds normalized");
            self.model.fair_value(&n)
          });
        priced.map_err(|e| errors.push(e)).ok()
      })
      .collect()
  }

  async fn update_regime(&self, estimates: &[FairValueEstimate], report: &mut CycleReport) -> Regime {
    let (graph, rejected) = MarketGraph::from_fair_values(estimates);
    report.errors.extend(rejected);
    report.graph_nodes = graph.node_count();
    report.graph_edges = graph.edge_count();

    match self.solver.decompose(&graph) {
      Ok(result) => {
        let norm = result.curl_norm();
        report.curl_norm = Some(norm);
        debug!(
          method = ?result.method,
          iterations = result.iterations,
          curl_ratio = result.curl_ratio(),
          "Hodge decomposition solved"
        );
        self.ctx.observe_curl(norm).await
      }
      Err(e) => {
        warn!(error = %e, "Decomposition failed, regime degraded to conservative");
        self.ctx.degrade_regime().await
      }
    }
  }

  /// Fetch every event's quote concurrently, each under its own timeout.
  async fn fetch_market_quotes(
    &self,
    fair_values: Vec<FairValueEstimate>,
    errors: &mut Vec<PricingError>,
  ) -> Vec<(FairValueEstimate, MarketQuote)> {
    let timeout = self.fetch_timeout;
    let fetches = fair_values.into_iter().map(|fv| {
      let feed = Arc::clone(&self.market_feed);
      async move {
        let started = Instant::now();
        let result = tokio::time::timeout(timeout, feed.fetch_quote(&fv.event_id)).await;
        (fv, result, started.elapsed())
      }
    });

    let mut pairs = Vec::new();
    for (fv, result, elapsed) in join_all(fetches).await {
      match result {
        Ok(Ok(Some(quote))) => pairs.push((fv, quote)),
        Ok(Ok(None)) => debug!(event_id = %fv.event_id, "No contract listed"),
        Ok(Err(e)) => errors.push(PricingError::data(
          fv.event_id,
          format!("market quote fetch failed: {e:#}"),
        )),
        Err(_) => errors.push(PricingError::Timeout {
          event_id: fv.event_id,
          what: "market quote",
          elapsed,
        }),
      }
    }
    pairs
  }

  /// Submit intents concurrently.
  ///
  /// Only an explicit venue rejection frees a fingerprint. An order whose
  /// submission timed out or errored may still be live, so its entry
  /// stays `Submitted`.
  async fn dispatch(&self, intents: &[OrderIntent]) -> DispatchOutcome {
    let timeout = self.fetch_timeout;
    let submissions = intents.iter().map(|intent| {
      let exec = Arc::clone(&self.execution);
      async move { (intent, tokio::time::timeout(timeout, exec.submit(intent)).await) }
    });

    let mut outcome = DispatchOutcome::default();
    for (intent, result) in join_all(submissions).await {
      match result {
        Ok(Ok(report)) if report.accepted => {
          info!(
            intent_id = %intent.id,
            venue_order_id = report.venue_order_id.as_deref().unwrap_or(""),
            "Intent accepted"
          );
          outcome.accepted += 1;
        }
        Ok(Ok(report)) => {
          warn!(
            intent_id = %intent.id,
            reason = report.rejection_reason.as_deref().unwrap_or("unspecified"),
            "Intent rejected"
          );
          self.ctx.record_outcome(&intent.fingerprint, OrderStatus::Rejected).await;
          outcome.rejected += 1;
        }
        Ok(Err(e)) => {
          warn!(
            intent_id = %intent.id,
            fingerprint = %intent.fingerprint,
            error = %e,
            "Intent submission failed, fingerprint held until TTL"
          );
          outcome.unconfirmed += 1;
        }
        Err(_) => {
          warn!(
            intent_id = %intent.id,
            fingerprint = %intent.fingerprint,
            "Intent submission timed out, fingerprint held until TTL"
          );
          outcome.unconfirmed += 1;
        }
      }
    }
    outcome
  }
}

#[derive(Debug, Default)]
struct DispatchOutcome {
  accepted: usize,
  rejected: usize,
  unconfirmed: usize,
}

/// Keep the most recent estimate per event, ordered by event id.
fn latest_per_event(estimates: &[FairValueEstimate]) -> Vec<FairValueEstimate> {
  let mut latest: HashMap<&EventId, &FairValueEstimate> = HashMap::new();
  for fv in estimates {
    latest
      .entry(&fv.event_id)
      .and_modify(|cur| {
        if fv.observed_at >= cur.observed_at {
          *cur = fv;
        }
      })
      .or_insert(fv);
  }
  let mut out: Vec<FairValueEstimate> = latest.into_values().cloned().collect();
  out.sort_by(|a, b| a.event_id.cmp(&b.event_id));
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fv(event: &str, secs: i64, p: f64) -> FairValueEstimate {
    FairValueEstimate {
      event_id: event.into(),
      favorite: "A".into(),
      underdog: "B".into(),
      mu: 3.0,
      sigma: 12.0,
      probability: p,
      confidence: 1.0 / 144.0,
      source: "test".into(),
      observed_at: DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default(),
    }
  }

  #[test]
  fn test_most_recent_quote_wins() {
    let picked = latest_per_event(&[fv("e2", 10, 0.6), fv("e1", 5, 0.55), fv("e2", 20, 0.65)]);
    assert_eq!(picked.len(), 2);
    assert_eq!(picked[0].event_id, "e1");
    assert!((picked[1].probability - 0.65).abs() < f64::EPSILON);
  }

  #[test]
  fn test_errors_by_kind() {
    let report = CycleReport {
      errors: vec![
        PricingError::data("a", "x"),
        PricingError::data("b", "y"),
        PricingError::Domain("z".into()),
      ],
      ..CycleReport::default()
    };
    let counts = report.errors_by_kind();
    assert_eq!(counts["data"], 2);
    assert_eq!(counts["domain"], 1);
  }
}
