//! Configuration Module - TOML-based Engine Configuration
//!
//! Loads and validates configuration from `config.toml`. Every
//! threshold, window and model constant is externalized here -
//! nothing is hardcoded in the domain layer.

pub mod loader;

use std::time::Duration;

use serde::Deserialize;

use crate::domain::decision::Thresholds;
use crate::domain::gaussian::{GaussianModel, SigmaBand};
use crate::domain::hodge::SolverConfig;
use crate::domain::regime::RegimeDetector;

/// Top-level engine configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the first scan cycle runs.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Engine identity and loop timing.
  pub engine: EngineConfig,
  /// Edge thresholds, sizing and filters.
  pub strategy: StrategyConfig,
  /// Gaussian model parameters.
  #[serde(default)]
  pub model: ModelConfig,
  /// Curl-norm regime detection.
  #[serde(default)]
  pub regime: RegimeConfig,
  /// Laplacian solver tuning.
  #[serde(default)]
  pub solver: SolverSettings,
  /// Snapshot feed sources.
  pub feeds: FeedsConfig,
  /// Intent journal.
  #[serde(default)]
  pub journal: JournalConfig,
  /// Metrics and monitoring.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Engine identity and loop timing.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
  /// Human-readable instance name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Log intents instead of submitting them.
  #[serde(default)]
  pub dry_run: bool,
  /// Interval between scan cycles (milliseconds).
  #[serde(default = "default_scan_interval")]
  pub scan_interval_ms: u64,
  /// Bound on each odds / market fetch (milliseconds).
  #[serde(default = "default_fetch_timeout")]
  pub fetch_timeout_ms: u64,
}

impl EngineConfig {
  pub const fn scan_interval(&self) -> Duration {
    Duration::from_millis(self.scan_interval_ms)
  }

  pub const fn fetch_timeout(&self) -> Duration {
    Duration::from_millis(self.fetch_timeout_ms)
  }
}

/// Strategy thresholds and sizing.
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
  /// Edge at or above which the book is crossed (e.g. 0.03).
  pub taker_edge_threshold: f64,
  /// Taker threshold under the high-opportunity regime.
  pub relaxed_edge_threshold: f64,
  /// Amount subtracted from fair value for maker quotes.
  pub maker_spread_buffer: f64,
  /// Maximum notional per intent.
  pub max_position_size: f64,
  /// Minimum contracts at the touch.
  pub min_liquidity_depth: f64,
  /// Maximum input age (milliseconds).
  #[serde(default = "default_freshness_window")]
  pub quote_freshness_window_ms: u64,
  /// Fingerprint suppression window (milliseconds).
  #[serde(default = "default_dedup_ttl")]
  pub dedup_ttl_ms: u64,
  /// Price increment of the exchange.
  #[serde(default = "default_tick_size")]
  pub tick_size: f64,
  /// Flat fee per contract charged on taker fills.
  #[serde(default)]
  pub taker_fee: f64,
  /// Minimum ROI for an opportunity to be considered.
  #[serde(default)]
  pub min_roi: f64,
  #[serde(default = "default_true")]
  pub enable_taker: bool,
  #[serde(default = "default_true")]
  pub enable_maker: bool,
}

impl StrategyConfig {
  pub const fn freshness_window(&self) -> Duration {
    Duration::from_millis(self.quote_freshness_window_ms)
  }

  pub const fn dedup_ttl(&self) -> Duration {
    Duration::from_millis(self.dedup_ttl_ms)
  }

  pub const fn thresholds(&self) -> Thresholds {
    Thresholds {
      taker: self.taker_edge_threshold,
      relaxed: self.relaxed_edge_threshold,
      taker_fee: self.taker_fee,
      enable_taker: self.enable_taker,
      enable_maker: self.enable_maker,
    }
  }
}

/// Gaussian model parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
  /// Saturation guard: probabilities stay within [ε, 1 − ε].
  #[serde(default = "default_epsilon")]
  pub probability_epsilon: f64,
  /// σ for coin-flip and pick'em lines.
  #[serde(default = "default_fallback_sigma")]
  pub fallback_sigma: f64,
  /// Optional σ plausibility band; disabled when absent.
  #[serde(default)]
  pub sigma_band: Option<SigmaBand>,
}

impl Default for ModelConfig {
  fn default() -> Self {
    Self {
      probability_epsilon: default_epsilon(),
      fallback_sigma: default_fallback_sigma(),
      sigma_band: None,
    }
  }
}

impl ModelConfig {
  pub fn build(&self) -> GaussianModel {
    let model = GaussianModel::new(self.probability_epsilon, self.fallback_sigma);
    match self.sigma_band {
      Some(band) => model.with_sigma_band(band),
      None => model,
    }
  }
}

/// Regime detector parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct RegimeConfig {
  /// Number of past curl norms kept.
  #[serde(default = "default_regime_window")]
  pub window: usize,
  /// Trigger at `mean + k_sigma · std`.
  #[serde(default = "default_k_sigma")]
  pub k_sigma: f64,
  /// History length required before the trigger can fire.
  #[serde(default = "default_min_samples")]
  pub min_samples: usize,
}

impl Default for RegimeConfig {
  fn default() -> Self {
    Self {
      window: default_regime_window(),
      k_sigma: default_k_sigma(),
      min_samples: default_min_samples(),
    }
  }
}

impl RegimeConfig {
  pub fn build(&self) -> RegimeDetector {
    RegimeDetector::new(self.window, self.k_sigma, self.min_samples)
  }
}

/// Laplacian solver tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct SolverSettings {
  /// Largest reduced system solved by dense Cholesky.
  #[serde(default = "default_direct_max")]
  pub direct_solve_max_nodes: usize,
  /// Conjugate gradient iteration cap.
  #[serde(default = "default_max_iterations")]
  pub max_iterations: usize,
  /// Conjugate gradient relative residual tolerance.
  #[serde(default = "default_tolerance")]
  pub tolerance: f64,
}

impl Default for SolverSettings {
  fn default() -> Self {
    Self {
      direct_solve_max_nodes: default_direct_max(),
      max_iterations: default_max_iterations(),
      tolerance: default_tolerance(),
    }
  }
}

impl SolverSettings {
  pub const fn solver_config(&self) -> SolverConfig {
    SolverConfig {
      direct_max_nodes: self.direct_solve_max_nodes,
      max_iterations: self.max_iterations,
      tolerance: self.tolerance,
    }
  }
}

/// Snapshot feed sources.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedsConfig {
  /// JSON array of odds quotes, re-read every cycle.
  pub odds_snapshot_path: String,
  /// JSON array of market quotes, re-read every cycle.
  pub market_snapshot_path: String,
}

/// Intent journal configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JournalConfig {
  /// Directory for the JSONL intent journal.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
}

impl Default for JournalConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_addr(),
      health_port: default_health_port(),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_scan_interval() -> u64 {
  5_000
}

fn default_fetch_timeout() -> u64 {
  2_000
}

fn default_freshness_window() -> u64 {
  60_000
}

fn default_dedup_ttl() -> u64 {
  300_000
}

fn default_tick_size() -> f64 {
  0.01
}

fn default_epsilon() -> f64 {
  1e-6
}

fn default_fallback_sigma() -> f64 {
  13.5
}

fn default_regime_window() -> usize {
  20
}

fn default_k_sigma() -> f64 {
  2.0
}

fn default_min_samples() -> usize {
  5
}

fn default_direct_max() -> usize {
  64
}

fn default_max_iterations() -> usize {
  1_000
}

fn default_tolerance() -> f64 {
  1e-10
}

fn default_data_dir() -> String {
  "data".to_string()
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_health_port() -> u16 {
  8080
}
