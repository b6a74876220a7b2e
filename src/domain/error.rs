//! Pricing error taxonomy.
//!
//! Every failure the pricing pipeline can produce for a single event
//! or a single cycle. Per-event variants skip that event only; the
//! cycle-scoped `LinearSystem` variant degrades the regime signal.
//! None of them is fatal; configuration errors are handled by
//! `anyhow` in the config loader instead.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while normalizing, pricing, decomposing or scanning.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    /// Malformed or missing odds / market data.
    #[error("data error for {event_id}: {reason}")]
    Data { event_id: String, reason: String },

    /// Input outside the domain of a numerical routine (e.g. quantile of 0 or 1).
    #[error("domain error: {0}")]
    Domain(String),

    /// A quote older than the freshness window.
    #[error("stale {what} for {event_id}: age {age_ms}ms exceeds {window_ms}ms")]
    StaleData {
        event_id: String,
        what: &'static str,
        age_ms: i64,
        window_ms: u64,
    },

    /// The graph Laplacian solve could not produce a potential.
    #[error("linear system error: {0}")]
    LinearSystem(String),

    /// Not enough size at the relevant price.
    #[error("insufficient liquidity for {event_id}: {available} < {required}")]
    Liquidity {
        event_id: String,
        available: f64,
        required: f64,
    },

    /// A collaborator fetch did not return within its bound.
    #[error("{what} fetch for {event_id} timed out after {elapsed:?}")]
    Timeout {
        event_id: String,
        what: &'static str,
        elapsed: Duration,
    },
}

impl PricingError {
    /// Shorthand for a `Data` error.
    pub fn data(event_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Data {
            event_id: event_id.into(),
            reason: reason.into(),
        }
    }

    /// Static label used as a log field and metrics label.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Data { .. } => "data",
            Self::Domain(_) => "domain",
            Self::StaleData { .. } => "stale",
            Self::LinearSystem(_) => "linear_system",
            Self::Liquidity { .. } => "liquidity",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// Attach an event id to a bare `Domain` error.
    ///
    /// The quantile routine knows nothing about events; callers that do
    /// re-label the message so the skip log names the event.
    #[must_use]
    pub fn for_event(self, event_id: &str) -> Self {
        match self {
            Self::Domain(msg) => Self::Domain(format!("{event_id}: {msg}")),
            other => other,
        }
    }
}

/// Result alias for the pricing pipeline.
pub type PricingResult<T> = Result<T, PricingError>;
