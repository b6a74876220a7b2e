//! Volatility regime detection from the curl-norm history.
//!
//! A cycle whose curl norm spikes above `mean + k·std` of recent cycles
//! signals unusual cross-market inconsistency, and the strategy relaxes
//! its taker threshold while it lasts.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Market regime for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    #[default]
    Conservative,
    HighOpportunity,
}

impl Regime {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::HighOpportunity => "high_opportunity",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Smallest std the trigger uses. A flat history would otherwise flip
/// the regime on float noise.
const STD_FLOOR: f64 = 1e-6;

/// Rolling curl-norm history with a `mean + k·std` trigger.
#[derive(Debug, Clone)]
pub struct RegimeDetector {
    window: usize,
    k_sigma: f64,
    min_samples: usize,
    history: VecDeque<f64>,
}

impl RegimeDetector {
    /// # Panics
    /// Panics if `window` is zero or `min_samples` exceeds `window`;
    /// both are rejected at config load.
    pub fn new(window: usize, k_sigma: f64, min_samples: usize) -> Self {
        assert!(window > 0, "regime window must be positive");
        assert!(min_samples <= window, "min_samples cannot exceed window");
        Self {
            window,
            k_sigma,
            min_samples,
            history: VecDeque::with_capacity(window + 1),
        }
    }

    /// Classify `norm` against the history, then record it.
    pub fn observe(&mut self, norm: f64) -> Regime {
        let regime = match self.threshold() {
            Some(threshold) if norm > threshold => Regime::HighOpportunity,
            _ => Regime::Conservative,
        };

        if norm.is_finite() {
            self.history.push_back(norm);
            while self.history.len() > self.window {
                self.history.pop_front();
            }
        }
        regime
    }

    /// Regime for a cycle whose decomposition failed. History is untouched.
    pub const fn degrade(&self) -> Regime {
        Regime::Conservative
    }

    /// Current trigger level, once enough history exists.
    pub fn threshold(&self) -> Option<f64> {
        if self.history.len() < self.min_samples.max(1) {
            return None;
        }
        let n = self.history.len() as f64;
        let mean = self.history.iter().sum::<f64>() / n;
        let var = self.history.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        Some(self.k_sigma.mul_add(var.sqrt().max(STD_FLOOR), mean))
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

impl Default for RegimeDetector {
    fn default() -> Self {
        Self::new(20, 2.0, 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_history_is_conservative() {
        let mut d = RegimeDetector::default();
        for _ in 0..4 {
            assert_eq!(d.observe(1.0), Regime::Conservative);
        }
        // Fifth observation still sees only four samples.
        assert_eq!(d.observe(100.0), Regime::Conservative);
    }

    #[test]
    fn test_spike_after_flat_history() {
        let mut d = RegimeDetector::default();
        for i in 0..10 {
            d.observe(1.0 + f64::from(i % 2) * 0.1);
        }
        assert_eq!(d.observe(5.0), Regime::HighOpportunity);
        assert_eq!(d.observe(1.05), Regime::Conservative);
    }

    #[test]
    fn test_flat_history_ignores_float_noise() {
        let mut d = RegimeDetector::default();
        for _ in 0..5 {
            d.observe(0.0);
        }
        assert_eq!(d.observe(1e-15), Regime::Conservative);
        assert_eq!(d.observe(0.5), Regime::HighOpportunity);

        let mut d = RegimeDetector::default();
        for _ in 0..5 {
            d.observe(2.0);
        }
        assert_eq!(d.observe(2.0 + 1e-12), Regime::Conservative);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut d = RegimeDetector::new(3, 2.0, 1);
        for x in [1.0, 2.0, 3.0, 4.0] {
            d.observe(x);
        }
        assert_eq!(d.len(), 3);
        // mean 3, std sqrt(2/3)
        let t = d.threshold().unwrap();
        assert!((t - (3.0 + 2.0 * (2.0_f64 / 3.0).sqrt())).abs() < 1e-12);
    }

    #[test]
    fn test_degrade_leaves_history() {
        let mut d = RegimeDetector::default();
        d.observe(1.0);
        assert_eq!(d.degrade(), Regime::Conservative);
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn test_non_finite_norm_not_recorded() {
        let mut d = RegimeDetector::new(5, 2.0, 1);
        d.observe(1.0);
        assert_eq!(d.observe(f64::NAN), Regime::Conservative);
        assert_eq!(d.len(), 1);
    }
}
