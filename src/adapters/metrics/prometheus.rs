//! Prometheus Metrics Registry - Engine Observability
//!
//! Registers and exposes Prometheus metrics for Grafana dashboards.
//! Covers cycle latency, skipped events, opportunities, intents,
//! dedup suppressions and the curl-norm regime signal.

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::domain::regime::Regime;
use crate::usecases::scan_engine::CycleReport;

/// Centralized Prometheus metrics for the scan engine.
///
/// All metrics follow the naming convention `hodge_vegas_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Full cycle latency (microseconds).
    pub cycle_latency_us: Histogram,
    /// Completed cycles.
    pub cycles: IntCounter,
    /// Cycles whose odds fetch failed or timed out.
    pub odds_fetch_failures: IntCounter,
    /// Events skipped, by error kind.
    pub events_skipped: IntCounterVec,
    /// Opportunities found, by recommended action.
    pub opportunities: IntCounterVec,
    /// Intents emitted, by execution style.
    pub intents: IntCounterVec,
    /// Intents rejected by the venue.
    pub intents_rejected: IntCounter,
    /// Submissions that timed out or failed in transport.
    pub intents_unconfirmed: IntCounter,
    /// Intents suppressed by the dedup cache.
    pub dedup_suppressed: IntCounter,
    /// Last weighted curl norm.
    pub curl_norm: Gauge,
    /// Current regime (1 = high opportunity).
    pub regime: IntGauge,
    /// Decompositions that failed.
    pub decomposition_failures: IntCounter,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let cycle_latency_us = Histogram::with_opts(
            HistogramOpts::new(
                "hodge_vegas_cycle_latency_us",
                "Scan cycle latency in microseconds",
            )
            .buckets(vec![
                500.0, 1_000.0, 5_000.0, 10_000.0, 50_000.0, 100_000.0, 500_000.0, 2_000_000.0,
            ]),
        )?;

        let cycles = IntCounter::new("hodge_vegas_cycles_total", "Completed scan cycles")?;

        let odds_fetch_failures = IntCounter::new(
            "hodge_vegas_odds_fetch_failures_total",
            "Cycles skipped because the odds fetch failed or timed out",
        )?;

        let events_skipped = IntCounterVec::new(
            Opts::new(
                "hodge_vegas_events_skipped_total",
                "Events skipped with a per-event error",
            ),
            &["kind"],
        )?;

        let opportunities = IntCounterVec::new(
            Opts::new(
                "hodge_vegas_opportunities_total",
                "Opportunities found by recommended action",
            ),
            &["action"],
        )?;

        let intents = IntCounterVec::new(
            Opts::new("hodge_vegas_intents_total", "Order intents emitted"),
            &["style"],
        )?;

        let intents_rejected = IntCounter::new(
            "hodge_vegas_intents_rejected_total",
            "Order intents rejected by the venue",
        )?;

        let intents_unconfirmed = IntCounter::new(
            "hodge_vegas_intents_unconfirmed_total",
            "Submissions with no venue answer (timeout or transport error)",
        )?;

        let dedup_suppressed = IntCounter::new(
            "hodge_vegas_dedup_suppressed_total",
            "Intents suppressed by a live fingerprint",
        )?;

        let curl_norm = Gauge::new(
            "hodge_vegas_curl_norm",
            "Weighted L2 norm of the curl residual in the last cycle",
        )?;

        let regime = IntGauge::new(
            "hodge_vegas_regime_high_opportunity",
            "Whether the last cycle ran in the high-opportunity regime (1=yes, 0=no)",
        )?;

        let decomposition_failures = IntCounter::new(
            "hodge_vegas_decomposition_failures_total",
            "Cycles whose Hodge decomposition failed",
        )?;

        // Register all metrics
        registry.register(Box::new(cycle_latency_us.clone()))?;
        registry.register(Box::new(cycles.clone()))?;
        registry.register(Box::new(odds_fetch_failures.clone()))?;
        registry.register(Box::new(events_skipped.clone()))?;
        registry.register(Box::new(opportunities.clone()))?;
        registry.register(Box::new(intents.clone()))?;
        registry.register(Box::new(intents_rejected.clone()))?;
        registry.register(Box::new(intents_unconfirmed.clone()))?;
        registry.register(Box::new(dedup_suppressed.clone()))?;
        registry.register(Box::new(curl_norm.clone()))?;
        registry.register(Box::new(regime.clone()))?;
        registry.register(Box::new(decomposition_failures.clone()))?;

        Ok(Self {
            registry,
            cycle_latency_us,
            cycles,
            odds_fetch_failures,
            events_skipped,
            opportunities,
            intents,
            intents_rejected,
            intents_unconfirmed,
            dedup_suppressed,
            curl_norm,
            regime,
            decomposition_failures,
        })
    }

    /// Fold one cycle report into the metrics.
    pub fn record_cycle(&self, report: &CycleReport) {
        self.cycles.inc();
        self.cycle_latency_us
            .observe(report.elapsed.as_micros() as f64);

        if !report.odds_fetched {
            self.odds_fetch_failures.inc();
            return;
        }

        for (kind, count) in report.errors_by_kind() {
            self.events_skipped
                .with_label_values(&[kind])
                .inc_by(count as u64);
        }
        for (action, count) in &report.opportunities {
            self.opportunities
                .with_label_values(&[action.label()])
                .inc_by(*count as u64);
        }
        for intent in &report.intents {
            self.intents
                .with_label_values(&[intent.style.label()])
                .inc();
        }
        self.intents_rejected.inc_by(report.rejected as u64);
        self.intents_unconfirmed.inc_by(report.unconfirmed as u64);
        self.dedup_suppressed.inc_by(report.suppressed as u64);

        match report.curl_norm {
            Some(norm) => self.curl_norm.set(norm),
            None => self.decomposition_failures.inc(),
        }
        self.regime
            .set(i64::from(report.regime == Regime::HighOpportunity));
    }

    /// Render the registry in the Prometheus text format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics_self);
                async move {
                    match metrics.render() {
                        Ok(body) => (StatusCode::OK, body),
                        Err(e) => {
                            warn!(error = %e, "Failed to encode metrics");
                            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
                        }
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decision::Action;
    use crate::domain::error::PricingError;

    #[test]
    fn test_record_cycle_updates_counters() {
        let metrics = MetricsRegistry::new().unwrap();
        let mut report = CycleReport {
            odds_fetched: true,
            curl_norm: Some(1.25),
            regime: Regime::HighOpportunity,
            suppressed: 2,
            unconfirmed: 1,
            errors: vec![PricingError::data("e", "missing moneyline")],
            ..CycleReport::default()
        };
        report.opportunities.insert(Action::Taker, 3);
        metrics.record_cycle(&report);

        assert_eq!(metrics.cycles.get(), 1);
        assert_eq!(metrics.dedup_suppressed.get(), 2);
        assert_eq!(metrics.intents_unconfirmed.get(), 1);
        assert_eq!(metrics.regime.get(), 1);
        assert!((metrics.curl_norm.get() - 1.25).abs() < f64::EPSILON);
        assert_eq!(metrics.events_skipped.with_label_values(&["data"]).get(), 1);
        assert_eq!(metrics.opportunities.with_label_values(&["taker"]).get(), 3);

        let text = metrics.render().unwrap();
        assert!(text.contains("hodge_vegas_cycles_total 1"));
    }

    #[test]
    fn test_failed_fetch_counted() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics.record_cycle(&CycleReport::default());
        assert_eq!(metrics.odds_fetch_failures.get(), 1);
    }
}
