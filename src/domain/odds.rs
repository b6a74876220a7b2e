//! Odds normalization.
//!
//! Turns a raw bookmaker quote into a vig-free probability for the
//! favorite plus a canonical (favorite-negative) spread. This is the
//! first stage of every event's pricing; anything malformed stops
//! here with a `Data` error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{PricingError, PricingResult};
use super::trade::{EventId, OddsQuote};

/// Decimal odds are only recognized in this open band; anything at or
/// above the upper bound is read as American.
const DECIMAL_ODDS_MIN: f64 = 1.0;
const DECIMAL_ODDS_MAX: f64 = 10.0;

/// A quote with the bookmaker margin removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedOdds {
    pub event_id: EventId,
    /// Team with the higher vig-free probability.
    pub favorite: String,
    pub underdog: String,
    /// Vig-free probability that the favorite wins, in (0, 1).
    pub favorite_probability: f64,
    /// Spread magnitude (expected margin), ≥ 0.
    pub spread_magnitude: f64,
    /// Spread from the favorite's perspective, ≤ 0.
    pub canonical_spread: f64,
    /// Sum of raw implied probabilities (1 + vig).
    pub overround: f64,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

impl NormalizedOdds {
    /// Vig-free probability that the underdog wins.
    pub fn underdog_probability(&self) -> f64 {
        1.0 - self.favorite_probability
    }
}

/// Convert one moneyline to its implied probability.
///
/// Accepts American odds (`≥ +100`, `≤ −100`) and decimal odds in
/// (1, 10). Everything else is rejected.
///
/// # Errors
/// `Data` for zero, non-finite or ambiguous values.
pub fn implied_probability(event_id: &str, odds: f64) -> PricingResult<f64> {
    if !odds.is_finite() {
        return Err(PricingError::data(event_id, format!("non-finite moneyline {odds}")));
    }

    let p = if odds > DECIMAL_ODDS_MIN && odds < DECIMAL_ODDS_MAX {
        1.0 / odds
    } else if odds >= 100.0 {
        100.0 / (odds + 100.0)
    } else if odds <= -100.0 {
        -odds / (-odds + 100.0)
    } else {
        return Err(PricingError::data(
            event_id,
            format!("moneyline {odds} is neither American nor decimal odds"),
        ));
    };

    if p <= 0.0 || p >= 1.0 {
        return Err(PricingError::data(
            event_id,
            format!("implied probability {p} outside (0, 1)"),
        ));
    }
    Ok(p)
}

/// Two-way vig removal: scale both sides so they sum to 1.
///
/// # Errors
/// `Data` when the sum is not positive.
pub fn remove_vig(event_id: &str, p_a: f64, p_b: f64) -> PricingResult<(f64, f64)> {
    let total = p_a + p_b;
    if !(total.is_finite() && total > 0.0) {
        return Err(PricingError::data(event_id, "implied probabilities sum to zero"));
    }
    Ok((p_a / total, p_b / total))
}

/// Normalize a raw quote.
///
/// # Errors
/// `Data` when a moneyline is missing or invalid, the spread is not
/// finite, or the normalized probability leaves (0, 1).
pub fn normalize(quote: &OddsQuote) -> PricingResult<NormalizedOdds> {
    let id = quote.event_id.as_str();

    let ml_a = quote
        .moneyline_a
        .ok_or_else(|| PricingError::data(id, format!("missing moneyline for {}", quote.side_a)))?;
    let ml_b = quote
        .moneyline_b
        .ok_or_else(|| PricingError::data(id, format!("missing moneyline for {}", quote.side_b)))?;

    if !quote.spread.is_finite() {
        return Err(PricingError::data(id, "non-finite point spread"));
    }

    let raw_a = implied_probability(id, ml_a)?;
    let raw_b = implied_probability(id, ml_b)?;
    let (p_a, p_b) = remove_vig(id, raw_a, raw_b)?;

    // Ties go to whichever side the spread favors, then side_a.
    let a_favored = if (p_a - p_b).abs() > f64::EPSILON {
        p_a > p_b
    } else {
        quote.spread <= 0.0
    };

    let (favorite, underdog, p_fav) = if a_favored {
        (&quote.side_a, &quote.side_b, p_a)
    } else {
        (&quote.side_b, &quote.side_a, p_b)
    };

    if !(p_fav > 0.0 && p_fav < 1.0) {
        return Err(PricingError::data(
            id,
            format!("normalized probability {p_fav} outside (0, 1)"),
        ));
    }

    let magnitude = quote.spread.abs();

    Ok(NormalizedOdds {
        event_id: quote.event_id.clone(),
        favorite: favorite.clone(),
        underdog: underdog.clone(),
        favorite_probability: p_fav,
        spread_magnitude: magnitude,
        canonical_spread: -magnitude,
        overround: raw_a + raw_b,
        source: quote.source.clone(),
        timestamp: quote.timestamp,
    })
}
