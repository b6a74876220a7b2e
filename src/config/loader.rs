//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.
//! Any violation is fatal: the engine never starts half-configured.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Load and validate configuration from a TOML file.
///
/// # Arguments
/// * `path` - Path to the config.toml file
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    name = %config.engine.name,
    dry_run = config.engine.dry_run,
    taker_threshold = config.strategy.taker_edge_threshold,
    relaxed_threshold = config.strategy.relaxed_edge_threshold,
    scan_interval_ms = config.engine.scan_interval_ms,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
///
/// # Errors
/// Returns error if parsing fails or validation rules are violated.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;
  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Non-negative thresholds, relaxed ≤ taker
/// - Positive durations and sizes
/// - Valid probability ranges (0..1)
/// - Consistent regime and solver settings
fn validate_config(config: &AppConfig) -> Result<()> {
  let engine = &config.engine;
  anyhow::ensure!(
    LOG_LEVELS.contains(&engine.log_level.as_str()),
    "log_level must be one of {:?}, got {}",
    LOG_LEVELS,
    engine.log_level
  );
  anyhow::ensure!(engine.scan_interval_ms > 0, "scan_interval_ms must be positive");
  anyhow::ensure!(engine.fetch_timeout_ms > 0, "fetch_timeout_ms must be positive");

  // Strategy validation
  let s = &config.strategy;
  anyhow::ensure!(
    s.taker_edge_threshold.is_finite() && s.taker_edge_threshold >= 0.0,
    "taker_edge_threshold must be non-negative, got {}",
    s.taker_edge_threshold
  );
  anyhow::ensure!(
    s.relaxed_edge_threshold.is_finite() && s.relaxed_edge_threshold >= 0.0,
    "relaxed_edge_threshold must be non-negative, got {}",
    s.relaxed_edge_threshold
  );
  anyhow::ensure!(
    s.relaxed_edge_threshold <= s.taker_edge_threshold,
    "relaxed_edge_threshold ({}) must not exceed taker_edge_threshold ({})",
    s.relaxed_edge_threshold,
    s.taker_edge_threshold
  );
  anyhow::ensure!(
    s.maker_spread_buffer >= 0.0 && s.maker_spread_buffer < 1.0,
    "maker_spread_buffer must be in [0, 1), got {}",
    s.maker_spread_buffer
  );
  anyhow::ensure!(
    s.max_position_size.is_finite() && s.max_position_size > 0.0,
    "max_position_size must be positive"
  );
  anyhow::ensure!(
    s.min_liquidity_depth.is_finite() && s.min_liquidity_depth >= 0.0,
    "min_liquidity_depth must be non-negative"
  );
  anyhow::ensure!(
    s.quote_freshness_window_ms > 0,
    "quote_freshness_window_ms must be positive"
  );
  anyhow::ensure!(s.dedup_ttl_ms > 0, "dedup_ttl_ms must be positive");
  anyhow::ensure!(
    s.tick_size > 0.0 && s.tick_size < 0.5,
    "tick_size must be in (0, 0.5), got {}",
    s.tick_size
  );
  anyhow::ensure!(
    s.taker_fee >= 0.0 && s.taker_fee < 1.0,
    "taker_fee must be in [0, 1), got {}",
    s.taker_fee
  );
  anyhow::ensure!(s.min_roi.is_finite(), "min_roi must be finite");

  // Model validation
  let m = &config.model;
  anyhow::ensure!(
    m.probability_epsilon > 0.0 && m.probability_epsilon < 0.5,
    "probability_epsilon must be in (0, 0.5), got {}",
    m.probability_epsilon
  );
  anyhow::ensure!(
    m.fallback_sigma.is_finite() && m.fallback_sigma > 0.0,
    "fallback_sigma must be positive, got {}",
    m.fallback_sigma
  );
  if let Some(band) = m.sigma_band {
    anyhow::ensure!(
      band.min > 0.0 && band.min < band.max && band.max.is_finite(),
      "sigma_band must satisfy 0 < min < max, got [{}, {}]",
      band.min,
      band.max
    );
  }

  // Regime validation
  let r = &config.regime;
  anyhow::ensure!(r.window > 0, "regime window must be positive");
  anyhow::ensure!(
    r.min_samples <= r.window,
    "regime min_samples ({}) must not exceed window ({})",
    r.min_samples,
    r.window
  );
  anyhow::ensure!(
    r.k_sigma.is_finite() && r.k_sigma >= 0.0,
    "regime k_sigma must be non-negative"
  );

  // Solver validation
  anyhow::ensure!(
    config.solver.max_iterations > 0,
    "solver max_iterations must be positive"
  );
  anyhow::ensure!(
    config.solver.tolerance > 0.0 && config.solver.tolerance < 1.0,
    "solver tolerance must be in (0, 1)"
  );

  // Feed validation
  anyhow::ensure!(
    !config.feeds.odds_snapshot_path.is_empty(),
    "odds_snapshot_path must not be empty"
  );
  anyhow::ensure!(
    !config.feeds.market_snapshot_path.is_empty(),
    "market_snapshot_path must not be empty"
  );

  Ok(())
}
