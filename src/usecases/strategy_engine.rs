//! Strategy Engine - Opportunities to Order Intents
//!
//! Turns classified opportunities into priced, sized intents and runs
//! each through the dedup cache. Every event walks its lifecycle
//! `Idle → SignalDetected → {Taker | Maker} → Submitted`; an event that
//! cannot be priced or sized returns to `Idle` without an intent.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::config::StrategyConfig;
use crate::domain::decision::{self, Action, EventState};
use crate::domain::opportunity::Opportunity;
use crate::domain::trade::{EventId, ExecutionStyle, OrderIntent};

use super::context::EngineContext;

/// Why an actionable opportunity produced no intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoIntent {
  /// Quantized price outside `[tick, 1 − tick]`.
  PriceOutOfBounds(Decimal),
  /// Fewer than one whole contract.
  ZeroSize,
  /// Price could not be represented exactly.
  Unrepresentable,
}

impl std::fmt::Display for NoIntent {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::PriceOutOfBounds(p) => write!(f, "price {p} outside tradable range"),
      Self::ZeroSize => write!(f, "size rounds to zero contracts"),
      Self::Unrepresentable => write!(f, "price not representable"),
    }
  }
}

/// Result of one cycle's strategy pass.
#[derive(Debug, Default)]
pub struct StrategyOutcome {
  /// Newly claimed intents, ready for dispatch.
  pub intents: Vec<OrderIntent>,
  /// Intents dropped because their fingerprint was live.
  pub suppressed: usize,
  /// Actionable opportunities that could not become intents.
  pub unbuildable: Vec<(EventId, NoIntent)>,
}

/// Pricing and sizing rules for intents.
#[derive(Debug, Clone)]
pub struct StrategyEngine {
  maker_spread_buffer: f64,
  max_position_size: f64,
  tick: Decimal,
}

impl StrategyEngine {
  pub const fn new(maker_spread_buffer: f64, max_position_size: f64, tick: Decimal) -> Self {
    Self {
      maker_spread_buffer,
      max_position_size,
      tick,
    }
  }

  pub fn from_config(config: &StrategyConfig) -> Self {
    let tick = Decimal::from_f64(config.tick_size).unwrap_or_else(|| Decimal::new(1, 2));
    Self::new(config.maker_spread_buffer, config.max_position_size, tick)
  }

  /// Price and size an intent for `opp` without touching the cache.
  ///
  /// Returns `Ok(None)` for `Idle` opportunities.
  ///
  /// # Errors
  /// `NoIntent` when the price or size is not tradable.
  pub fn build_intent(
    &self,
    opp: &Opportunity,
    now: DateTime<Utc>,
  ) -> Result<Option<OrderIntent>, NoIntent> {
    if opp.action == Action::Idle {
      return Ok(None);
    }
    let crossing = opp.crossing_price().ok_or(NoIntent::Unrepresentable)?;

    let (price, size, style) = match opp.action {
      Action::Idle => return Ok(None),
      Action::Taker => {
        let price = decision::quantize_up(crossing, self.tick);
        let size = decision::taker_size(opp.depth, self.max_position_size, price);
        (
          price,
          size,
          ExecutionStyle::Taker {
            crossed_price: opp.market_price,
          },
        )
      }
      Action::Maker => {
        let price =
          decision::maker_price(opp.fair_value, self.maker_spread_buffer, crossing, self.tick)
            .ok_or(NoIntent::Unrepresentable)?;
        let size = decision::size_for_cap(self.max_position_size, price);
        (
          price,
          size,
          ExecutionStyle::Maker {
            fair_value: opp.fair_value,
            spread_buffer: self.maker_spread_buffer,
          },
        )
      }
    };

    if !decision::price_in_bounds(price, self.tick) {
      return Err(NoIntent::PriceOutOfBounds(price));
    }
    if size == 0 {
      return Err(NoIntent::ZeroSize);
    }

    Ok(Some(OrderIntent::new(
      opp.event_id.clone(),
      opp.contract_id.clone(),
      opp.side,
      price,
      size,
      style,
      now,
    )))
  }

  /// Build intents for every actionable opportunity and claim their
  /// fingerprints. Only claimed intents are returned.
  #[instrument(skip_all, fields(opportunities = opportunities.len()))]
  pub async fn decide(
    &self,
    opportunities: &[Opportunity],
    ctx: &EngineContext,
    now: DateTime<Utc>,
  ) -> StrategyOutcome {
    let mut outcome = StrategyOutcome::default();

    for opp in opportunities {
      if opp.action == Action::Idle {
        continue;
      }
      let mut state = advance(EventState::Idle, EventState::SignalDetected, &opp.event_id);

      let intent = match self.build_intent(opp, now) {
        Ok(Some(intent)) => intent,
        Ok(None) => continue,
        Err(reason) => {
          warn!(event_id = %opp.event_id, action = opp.action.label(), %reason, "No intent");
          advance(state, EventState::Idle, &opp.event_id);
          outcome.unbuildable.push((opp.event_id.clone(), reason));
          continue;
        }
      };

      let styled = match opp.action {
        Action::Taker => EventState::Taker,
        _ => EventState::Maker,
      };
      state = advance(state, styled, &opp.event_id);

      if !ctx.try_claim(&intent.fingerprint, now).await {
        debug!(fingerprint = %intent.fingerprint, "Duplicate intent suppressed");
        outcome.suppressed += 1;
        continue;
      }
      advance(state, EventState::Submitted, &opp.event_id);

      info!(
        event_id = %intent.event_id,
        side = %intent.side,
        style = intent.style.label(),
        price = %intent.price,
        size = intent.size,
        edge = opp.edge,
        "Intent emitted"
      );
      outcome.intents.push(intent);
    }

    outcome
  }
}

/// Step the lifecycle, logging (not failing) on an illegal edge.
fn advance(from: EventState, to: EventState, event_id: &str) -> EventState {
  match from.transition(to) {
    Ok(next) => next,
    Err(e) => {
      warn!(event_id, error = %e, "Lifecycle violation");
      from
    }
  }
}
