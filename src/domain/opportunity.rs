//! Edge and ROI of one contract against its model fair value.
//!
//! A "yes" contract can be bought at the ask, and a "no" can be bought
//! at `1 − bid`. Both sides are priced and the better one is kept.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::decision::{self, Action};
use super::error::{PricingError, PricingResult};
use super::gaussian::FairValueEstimate;
use super::trade::{ContractId, EventId, MarketQuote, Side};

/// A priced trading opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub event_id: EventId,
    pub contract_id: ContractId,
    /// Side that would be bought.
    pub side: Side,
    /// Fair value of the side bought.
    pub fair_value: f64,
    /// Ask of the side bought.
    pub market_price: f64,
    /// `fair_value − market_price`
    pub edge: f64,
    /// `edge / market_price`
    pub roi: f64,
    /// Edge after the flat taker fee.
    pub net_edge: f64,
    /// Contracts available at the touch. The venue quotes one symmetric
    /// book per contract, so this is the depth for either side.
    pub depth: f64,
    pub best_bid: f64,
    pub best_ask: f64,
    pub action: Action,
    /// Older of the two input timestamps.
    pub as_of: DateTime<Utc>,
}

impl Opportunity {
    /// Exact price at which an order on `side` crosses the book: the
    /// ask for Yes, `1 − bid` for No, complemented in `Decimal`.
    pub fn crossing_price(&self) -> Option<Decimal> {
        match self.side {
            Side::Yes => decision::book_price(self.best_ask),
            Side::No => decision::book_price(self.best_bid).map(|bid| Decimal::ONE - bid),
        }
    }
}

/// Rejects quotes that cannot be priced against.
///
/// # Errors
/// `Data` when bid/ask are not finite, fall outside (0, 1), or are crossed,
/// or the size is negative.
pub fn validate_quote(quote: &MarketQuote) -> PricingResult<()> {
    let id = quote.event_id.as_str();
    let in_unit = |x: f64| x.is_finite() && x > 0.0 && x < 1.0;
    if !in_unit(quote.best_bid) || !in_unit(quote.best_ask) {
        return Err(PricingError::data(
            id,
            format!(
                "bid {} / ask {} outside (0, 1)",
                quote.best_bid, quote.best_ask
            ),
        ));
    }
    if quote.best_bid > quote.best_ask {
        return Err(PricingError::data(
            id,
            format!("crossed book: bid {} > ask {}", quote.best_bid, quote.best_ask),
        ));
    }
    if !(quote.available_size.is_finite() && quote.available_size >= 0.0) {
        return Err(PricingError::data(
            id,
            format!("invalid size {}", quote.available_size),
        ));
    }
    Ok(())
}

/// Price both sides of `quote` against `fair` and keep the larger edge.
///
/// The returned opportunity is `Idle`; the caller classifies it.
///
/// # Errors
/// `Data` when the contract's outcome is neither team of the estimate.
pub fn evaluate(
    fair: &FairValueEstimate,
    quote: &MarketQuote,
    taker_fee: f64,
) -> PricingResult<Opportunity> {
    let fair_yes = fair.probability_for(&quote.outcome)?;

    let yes_price = quote.best_ask;
    let yes_edge = fair_yes - yes_price;

    let fair_no = 1.0 - fair_yes;
    let no_price = 1.0 - quote.best_bid;
    let no_edge = fair_no - no_price;

    let (side, fair_value, market_price, edge) = if no_edge > yes_edge {
        (Side::No, fair_no, no_price, no_edge)
    } else {
        (Side::Yes, fair_yes, yes_price, yes_edge)
    };

    Ok(Opportunity {
        event_id: quote.event_id.clone(),
        contract_id: quote.contract_id.clone(),
        side,
        fair_value,
        market_price,
        edge,
        roi: edge / market_price,
        net_edge: edge - taker_fee,
        depth: quote.available_size,
        best_bid: quote.best_bid,
        best_ask: quote.best_ask,
        action: Action::Idle,
        as_of: fair.observed_at.min(quote.timestamp),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fair(p: f64) -> FairValueEstimate {
        FairValueEstimate {
            event_id: "NBA-LAL-GSW".into(),
            favorite: "GSW".into(),
            underdog: "LAL".into(),
            mu: 5.0,
            sigma: 10.0,
            probability: p,
            confidence: 0.01,
            source: "test".into(),
            observed_at: Utc::now(),
        }
    }

    fn quote(outcome: &str, bid: f64, ask: f64) -> MarketQuote {
        MarketQuote {
            contract_id: format!("KX-{outcome}"),
            event_id: "NBA-LAL-GSW".into(),
            outcome: outcome.into(),
            best_bid: bid,
            best_ask: ask,
            available_size: 500.0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_yes_edge_and_roi() {
        let opp = evaluate(&fair(0.70), &quote("GSW", 0.50, 0.52), 0.0).unwrap();
        assert_eq!(opp.side, Side::Yes);
        assert!((opp.edge - 0.18).abs() < 1e-12);
        assert!((opp.roi - 0.18 / 0.52).abs() < 1e-12);
        assert_eq!(opp.action, Action::Idle);
    }

    #[test]
    fn test_no_side_chosen_when_overpriced() {
        // Fair 0.40 for GSW, bid 0.55: buying NO at 0.45 is worth 0.60.
        let opp = evaluate(&fair(0.40), &quote("GSW", 0.55, 0.57), 0.0).unwrap();
        assert_eq!(opp.side, Side::No);
        assert!((opp.market_price - 0.45).abs() < 1e-12);
        assert!((opp.edge - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_no_crossing_price_is_exact_complement() {
        let opp = evaluate(&fair(0.55), &quote("GSW", 0.57, 0.60), 0.0).unwrap();
        assert_eq!(opp.side, Side::No);
        assert_eq!(opp.crossing_price(), Some(rust_decimal_macros::dec!(0.43)));

        let yes = evaluate(&fair(0.70), &quote("GSW", 0.50, 0.52), 0.0).unwrap();
        assert_eq!(yes.crossing_price(), Some(rust_decimal_macros::dec!(0.52)));
    }

    #[test]
    fn test_underdog_contract_uses_complement() {
        let opp = evaluate(&fair(0.70), &quote("LAL", 0.20, 0.25), 0.0).unwrap();
        assert!((opp.fair_value - 0.30).abs() < 1e-12);
        assert!((opp.edge - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_taker_fee_reduces_net_edge() {
        let opp = evaluate(&fair(0.70), &quote("GSW", 0.50, 0.52), 0.02).unwrap();
        assert!((opp.net_edge - 0.16).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_outcome_rejected() {
        assert!(evaluate(&fair(0.7), &quote("BOS", 0.5, 0.52), 0.0).is_err());
    }

    #[test]
    fn test_validate_quote() {
        assert!(validate_quote(&quote("GSW", 0.5, 0.52)).is_ok());
        assert!(validate_quote(&quote("GSW", 0.0, 0.52)).is_err());
        assert!(validate_quote(&quote("GSW", 0.6, 0.52)).is_err());
        assert!(validate_quote(&quote("GSW", 0.5, 1.0)).is_err());
    }
}
