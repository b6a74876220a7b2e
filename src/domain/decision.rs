//! Decision rules: action classification, per-event lifecycle, and the
//! price/size arithmetic behind order intents.

use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::regime::Regime;
use super::trade::OrderStatus;

/// What to do with an opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    Idle,
    Maker,
    Taker,
}

impl Action {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Maker => "maker",
            Self::Taker => "taker",
        }
    }
}

/// Edge thresholds and style toggles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Edge at or above which the book is crossed.
    pub taker: f64,
    /// Lower taker bar used in the high-opportunity regime.
    pub relaxed: f64,
    /// Flat fee per contract paid only when crossing.
    pub taker_fee: f64,
    pub enable_taker: bool,
    pub enable_maker: bool,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            taker: 0.03,
            relaxed: 0.02,
            taker_fee: 0.0,
            enable_taker: true,
            enable_maker: true,
        }
    }
}

/// Classify a gross edge under the current regime.
///
/// The taker bar is tested net of `taker_fee`; a resting maker order
/// pays no fee, so any positive gross edge qualifies for it.
pub fn classify(edge: f64, regime: Regime, thresholds: &Thresholds) -> Action {
    if !edge.is_finite() {
        return Action::Idle;
    }

    let net = edge - thresholds.taker_fee;
    let wants_taker = net >= thresholds.taker
        || (regime == Regime::HighOpportunity && net >= thresholds.relaxed);

    let action = if wants_taker {
        Action::Taker
    } else if edge > 0.0 {
        Action::Maker
    } else {
        Action::Idle
    };

    match action {
        Action::Taker if !thresholds.enable_taker => {
            if thresholds.enable_maker {
                Action::Maker
            } else {
                Action::Idle
            }
        }
        Action::Maker if !thresholds.enable_maker => Action::Idle,
        other => other,
    }
}

// ── Event lifecycle ──────────────────────────────────────────────────

/// Per-event decision state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    Idle,
    SignalDetected,
    Taker,
    Maker,
    Submitted,
    Filled,
    Rejected,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: EventState,
    pub to: EventState,
}

impl EventState {
    /// Move to `to` if the lifecycle allows it.
    ///
    /// # Errors
    /// `TransitionError` for any edge not in
    /// `Idle → SignalDetected → {Taker | Maker} → Submitted → {Filled | Rejected | Expired}`.
    pub const fn transition(self, to: Self) -> Result<Self, TransitionError> {
        let ok = matches!(
            (self, to),
            (Self::Idle, Self::SignalDetected)
                | (Self::SignalDetected, Self::Taker | Self::Maker | Self::Idle)
                | (Self::Taker | Self::Maker, Self::Submitted)
                | (Self::Submitted, Self::Filled | Self::Rejected | Self::Expired)
        );
        if ok {
            Ok(to)
        } else {
            Err(TransitionError { from: self, to })
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Filled | Self::Rejected | Self::Expired)
    }
}

impl From<OrderStatus> for EventState {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Submitted => Self::Submitted,
            OrderStatus::Filled => Self::Filled,
            OrderStatus::Rejected => Self::Rejected,
            OrderStatus::Expired => Self::Expired,
        }
    }
}

// ── Price and size arithmetic ────────────────────────────────────────

/// Decimal places kept when lifting a feed price out of `f64`.
const PRICE_DP: u32 = 8;

/// Exact decimal for a feed price, with binary float noise dropped.
pub fn book_price(price: f64) -> Option<Decimal> {
    Decimal::from_f64(price).map(|p| p.round_dp(PRICE_DP).normalize())
}

/// Largest multiple of `tick` not above `price`.
pub fn quantize_down(price: Decimal, tick: Decimal) -> Decimal {
    ((price / tick).floor() * tick).normalize()
}

/// Smallest multiple of `tick` not below `price`.
pub fn quantize_up(price: Decimal, tick: Decimal) -> Decimal {
    ((price / tick).ceil() * tick).normalize()
}

/// Whether `price` is a tradable probability price.
pub fn price_in_bounds(price: Decimal, tick: Decimal) -> bool {
    price >= tick && price <= Decimal::ONE - tick
}

/// Maker quote: `fair − buffer` rounded down, at least one tick below
/// the crossing price.
pub fn maker_price(fair: f64, buffer: f64, crossing: Decimal, tick: Decimal) -> Option<Decimal> {
    let target = quantize_down(book_price(fair - buffer)?, tick);
    let cap = quantize_up(crossing, tick) - tick;
    Some(target.min(cap))
}

/// Whole contracts affordable under `cap` at `price`.
pub fn size_for_cap(cap: f64, price: Decimal) -> u64 {
    if price <= Decimal::ZERO {
        return 0;
    }
    Decimal::from_f64(cap)
        .map(|c| (c / price).floor())
        .and_then(|n| n.to_u64())
        .unwrap_or(0)
}

/// Taker size: the smaller of the visible depth and the cap.
pub fn taker_size(depth: f64, cap: f64, price: Decimal) -> u64 {
    let depth = if depth > 0.0 {
        depth.floor().to_u64().unwrap_or(0)
    } else {
        0
    };
    depth.min(size_for_cap(cap, price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const TICK: Decimal = dec!(0.01);

    #[test]
    fn test_classify_thresholds() {
        let t = Thresholds::default();
        assert_eq!(classify(0.18, Regime::Conservative, &t), Action::Taker);
        assert_eq!(classify(0.03, Regime::Conservative, &t), Action::Taker);
        assert_eq!(classify(0.01, Regime::Conservative, &t), Action::Maker);
        assert_eq!(classify(0.0, Regime::Conservative, &t), Action::Idle);
        assert_eq!(classify(-0.05, Regime::HighOpportunity, &t), Action::Idle);
    }

    #[test]
    fn test_relaxed_threshold_only_in_high_opportunity() {
        let t = Thresholds::default();
        assert_eq!(classify(0.025, Regime::Conservative, &t), Action::Maker);
        assert_eq!(classify(0.025, Regime::HighOpportunity, &t), Action::Taker);
        assert_eq!(classify(0.015, Regime::HighOpportunity, &t), Action::Maker);
    }

    #[test]
    fn test_fee_only_raises_the_taker_bar() {
        let t = Thresholds {
            taker_fee: 0.02,
            ..Thresholds::default()
        };
        // Net 0.02 is below the taker bar, but the maker pays no fee.
        assert_eq!(classify(0.04, Regime::Conservative, &t), Action::Maker);
        assert_eq!(classify(0.05, Regime::Conservative, &t), Action::Taker);
        // Gross edge inside (0, fee) still rests.
        assert_eq!(classify(0.01, Regime::Conservative, &t), Action::Maker);
        assert_eq!(classify(0.04, Regime::HighOpportunity, &t), Action::Taker);
    }

    #[test]
    fn test_disabled_styles_downgrade() {
        let no_taker = Thresholds {
            enable_taker: false,
            ..Thresholds::default()
        };
        assert_eq!(classify(0.2, Regime::Conservative, &no_taker), Action::Maker);

        let nothing = Thresholds {
            enable_taker: false,
            enable_maker: false,
            ..Thresholds::default()
        };
        assert_eq!(classify(0.2, Regime::Conservative, &nothing), Action::Idle);

        let no_maker = Thresholds {
            enable_maker: false,
            ..Thresholds::default()
        };
        assert_eq!(classify(0.01, Regime::Conservative, &no_maker), Action::Idle);
        assert_eq!(classify(0.05, Regime::Conservative, &no_maker), Action::Taker);
    }

    #[test]
    fn test_lifecycle_happy_path() {
        let s = EventState::Idle
            .transition(EventState::SignalDetected)
            .and_then(|s| s.transition(EventState::Taker))
            .and_then(|s| s.transition(EventState::Submitted))
            .and_then(|s| s.transition(EventState::Filled))
            .unwrap();
        assert!(s.is_terminal());
    }

    #[test]
    fn test_lifecycle_rejects_illegal() {
        assert!(EventState::Idle.transition(EventState::Submitted).is_err());
        assert!(EventState::Maker.transition(EventState::Filled).is_err());
        assert!(EventState::Filled.transition(EventState::Rejected).is_err());
        let err = EventState::Expired.transition(EventState::Taker).unwrap_err();
        assert_eq!(err.from, EventState::Expired);
    }

    #[test]
    fn test_maker_price_never_crosses() {
        // Fair far above the ask: capped one tick under it.
        assert_eq!(maker_price(0.70, 0.01, dec!(0.52), TICK), Some(dec!(0.51)));
        // Fair just above the ask.
        assert_eq!(maker_price(0.535, 0.005, dec!(0.52), TICK), Some(dec!(0.51)));
        // Normal case: rounded down.
        assert_eq!(maker_price(0.556, 0.01, dec!(0.60), TICK), Some(dec!(0.54)));
    }

    #[test]
    fn test_book_price_drops_float_noise() {
        // 1 − 0.57 is 0.43000000000000005 in binary.
        assert_eq!(book_price(1.0 - 0.57), Some(dec!(0.43)));
        assert_eq!(quantize_up(book_price(1.0 - 0.57).unwrap(), TICK), dec!(0.43));
        assert_eq!(book_price(f64::NAN), None);
    }

    #[test]
    fn test_quantize_off_grid() {
        assert_eq!(quantize_up(dec!(0.525), TICK), dec!(0.53));
        assert_eq!(quantize_down(dec!(0.525), TICK), dec!(0.52));
        assert_eq!(quantize_up(dec!(0.52), TICK), dec!(0.52));
    }

    #[test]
    fn test_taker_size_is_min_of_depth_and_cap() {
        // Cap $100 at 0.52 → 192 contracts.
        assert_eq!(taker_size(500.0, 100.0, dec!(0.52)), 192);
        assert_eq!(taker_size(40.0, 100.0, dec!(0.52)), 40);
        assert_eq!(taker_size(f64::NAN, 100.0, dec!(0.52)), 0);
        assert_eq!(taker_size(f64::INFINITY, 100.0, dec!(0.52)), 0);
    }

    #[test]
    fn test_price_bounds() {
        assert!(price_in_bounds(dec!(0.01), TICK));
        assert!(price_in_bounds(dec!(0.99), TICK));
        assert!(!price_in_bounds(dec!(0), TICK));
        assert!(!price_in_bounds(dec!(1), TICK));
    }
}
