//! Core trading domain types.
//!
//! Defines the quotes that enter a scan cycle (bookmaker odds and
//! exchange top-of-book) and the order intents that leave it.
//!
//! Exposes two API surfaces:
//! - f64 probabilities and prices for the pricing math
//! - `Decimal` prices on `OrderIntent` so fingerprints hash exactly

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ────────────────────────────────────────────
// Type aliases consumed by ports and adapters
// ────────────────────────────────────────────

/// Event identifier shared by the odds feed and the exchange.
pub type EventId = String;

/// Exchange contract (ticker) identifier.
pub type ContractId = String;

// ────────────────────────────────────────────
// Inbound quotes
// ────────────────────────────────────────────

/// One bookmaker observation of a two-outcome event.
///
/// `spread` is quoted for `side_a`: negative means `side_a` is favored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    /// Event identifier.
    pub event_id: EventId,
    /// First outcome (team) name.
    pub side_a: String,
    /// Second outcome (team) name.
    pub side_b: String,
    /// Moneyline for `side_a` (American or decimal).
    pub moneyline_a: Option<f64>,
    /// Moneyline for `side_b` (American or decimal).
    pub moneyline_b: Option<f64>,
    /// Point spread from `side_a`'s perspective.
    pub spread: f64,
    /// Observation time.
    pub timestamp: DateTime<Utc>,
    /// Bookmaker / feed identifier.
    pub source: String,
}

/// Top of book for the "yes" side of a binary contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    /// Exchange contract identifier.
    pub contract_id: ContractId,
    /// Event this contract settles on.
    pub event_id: EventId,
    /// Team whose win pays "yes".
    pub outcome: String,
    /// Best bid for "yes" (0..1).
    pub best_bid: f64,
    /// Best ask for "yes" (0..1).
    pub best_ask: f64,
    /// Contracts available at the touch. The book is symmetric: resting
    /// yes bids are the no offers, so one depth serves both sides.
    pub available_size: f64,
    /// Snapshot time.
    pub timestamp: DateTime<Utc>,
}

impl MarketQuote {
    /// Mid price of the "yes" side.
    pub fn mid_price(&self) -> f64 {
        (self.best_bid + self.best_ask) / 2.0
    }
}

// ────────────────────────────────────────────
// Outbound intents
// ────────────────────────────────────────────

/// Which contract side an intent buys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Buy "yes".
    Yes,
    /// Buy "no" (equivalently, sell "yes").
    No,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yes => write!(f, "YES"),
            Self::No => write!(f, "NO"),
        }
    }
}

/// Execution style of an intent.
///
/// Tagged so the execution collaborator dispatches on the discriminant
/// rather than inspecting the order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum ExecutionStyle {
    /// Passive limit order resting below the crossing price.
    Maker {
        /// Fair value the quote was derived from.
        fair_value: f64,
        /// Buffer subtracted from fair value.
        spread_buffer: f64,
    },
    /// Aggressive order crossing the book at the touch.
    Taker {
        /// Best price on the opposite side at decision time.
        crossed_price: f64,
    },
}

impl ExecutionStyle {
    /// Short label for logs and metrics.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Maker { .. } => "maker",
            Self::Taker { .. } => "taker",
        }
    }
}

/// Dedup key for an intent: `(event, price, side)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub event_id: EventId,
    pub price: Decimal,
    pub side: Side,
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.event_id, self.side, self.price)
    }
}

/// An order the engine wants placed, consumed once by execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Client order id.
    pub id: Uuid,
    /// Event identifier.
    pub event_id: EventId,
    /// Contract to trade.
    pub contract_id: ContractId,
    /// Side bought.
    pub side: Side,
    /// Limit price, quantized to the tick.
    pub price: Decimal,
    /// Whole contracts (> 0).
    pub size: u64,
    /// Maker or taker, with style-specific data.
    pub style: ExecutionStyle,
    /// Dedup key.
    pub fingerprint: Fingerprint,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl OrderIntent {
    /// Build an intent; the fingerprint is derived from its fields.
    pub fn new(
        event_id: EventId,
        contract_id: ContractId,
        side: Side,
        price: Decimal,
        size: u64,
        style: ExecutionStyle,
        created_at: DateTime<Utc>,
    ) -> Self {
        let fingerprint = Fingerprint {
            event_id: event_id.clone(),
            price: price.normalize(),
            side,
        };
        Self {
            id: Uuid::new_v4(),
            event_id,
            contract_id,
            side,
            price,
            size,
            style,
            fingerprint,
            created_at,
        }
    }

    /// Whether this is a taker intent.
    pub const fn is_taker(&self) -> bool {
        matches!(self.style, ExecutionStyle::Taker { .. })
    }

    /// Notional cost (price × size).
    pub fn notional(&self) -> Decimal {
        self.price * Decimal::from(self.size)
    }
}

/// Lifecycle status of a submitted intent, tracked in the dedup cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Handed to execution (or logged in dry-run), awaiting an outcome.
    Submitted,
    /// Completely filled.
    Filled,
    /// Rejected by the venue or the collaborator.
    Rejected,
    /// Rested past the dedup TTL without a fill report.
    Expired,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_intent() -> OrderIntent {
        OrderIntent::new(
            "NBA-LAL-GSW".to_string(),
            "KXNBAGAME-LAL".to_string(),
            Side::Yes,
            dec!(0.52),
            40,
            ExecutionStyle::Taker { crossed_price: 0.52 },
            Utc::now(),
        )
    }

    #[test]
    fn test_intent_fingerprint_matches_fields() {
        let intent = sample_intent();
        assert_eq!(intent.fingerprint.event_id, "NBA-LAL-GSW");
        assert_eq!(intent.fingerprint.price, dec!(0.52));
        assert_eq!(intent.fingerprint.side, Side::Yes);
        assert!(intent.is_taker());
    }

    #[test]
    fn test_fingerprint_equal_for_equal_decimal_scale() {
        let a = Fingerprint {
            event_id: "e".into(),
            price: dec!(0.5),
            side: Side::No,
        };
        let b = Fingerprint {
            event_id: "e".into(),
            price: dec!(0.50),
            side: Side::No,
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_notional() {
        assert_eq!(sample_intent().notional(), dec!(20.80));
    }

    #[test]
    fn test_style_serializes_with_tag() {
        let json = serde_json::to_string(&ExecutionStyle::Maker {
            fair_value: 0.6,
            spread_buffer: 0.01,
        })
        .unwrap();
        assert!(json.contains("\"style\":\"maker\""));
    }

    #[test]
    fn test_side_display() {
        assert_eq!(format!("{}", Side::Yes), "YES");
        assert_eq!(format!("{}", Side::No), "NO");
    }
}
