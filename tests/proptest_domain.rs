//! Property-Based Tests - Domain Layer Invariants
//!
//! Uses `proptest` to verify that domain components maintain
//! mathematical invariants across random inputs.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;

use hodge_vegas::domain::decision::{self, Action, Thresholds, classify};
use hodge_vegas::domain::gaussian::{
    FairValueEstimate, GaussianModel, inverse_normal_cdf, normal_cdf,
};
use hodge_vegas::domain::graph::MarketGraph;
use hodge_vegas::domain::hodge::{HodgeSolver, SolverConfig};
use hodge_vegas::domain::odds::{self, NormalizedOdds};
use hodge_vegas::domain::opportunity;
use hodge_vegas::domain::regime::Regime;
use hodge_vegas::domain::trade::{MarketQuote, Side};
use hodge_vegas::usecases::StrategyEngine;

const NODES: usize = 10;

fn normalized(p_fav: f64, spread: f64) -> NormalizedOdds {
    NormalizedOdds {
        event_id: "PROP".into(),
        favorite: "Fav".into(),
        underdog: "Dog".into(),
        favorite_probability: p_fav,
        spread_magnitude: spread,
        canonical_spread: -spread,
        overround: 1.0,
        source: "prop".into(),
        timestamp: Utc::now(),
    }
}

fn fair_estimate(p_home: f64) -> FairValueEstimate {
    FairValueEstimate {
        event_id: "PROP".into(),
        favorite: "Home".into(),
        underdog: "Away".into(),
        mu: 3.0,
        sigma: 12.0,
        probability: p_home,
        confidence: 1.0 / 144.0,
        source: "prop".into(),
        observed_at: Utc::now(),
    }
}

fn book(bid_cents: i64, ask_cents: i64) -> MarketQuote {
    MarketQuote {
        contract_id: "KX-PROP".into(),
        event_id: "PROP".into(),
        outcome: "Home".into(),
        best_bid: bid_cents as f64 / 100.0,
        best_ask: ask_cents as f64 / 100.0,
        available_size: 500.0,
        timestamp: Utc::now(),
    }
}

fn graph_from(edges: &[(usize, usize, f64, f64)]) -> MarketGraph {
    let mut graph = MarketGraph::new();
    for &(a, b, flow, weight) in edges {
        if a != b {
            graph
                .add_observation(&format!("T{a}"), &format!("T{b}"), flow, weight)
                .unwrap();
        }
    }
    graph
}

fn edge_strategy() -> impl Strategy<Value = Vec<(usize, usize, f64, f64)>> {
    prop::collection::vec((0..NODES, 0..NODES, -20.0f64..20.0, 0.1f64..5.0), 1..30)
}

// ── Gaussian Model Properties ───────────────────────────────

proptest! {
    /// Φ(Φ⁻¹(p)) must recover p.
    #[test]
    fn quantile_inverts_cdf(p in 1e-6f64..(1.0 - 1e-6)) {
        let z = inverse_normal_cdf(p).unwrap();
        let back = normal_cdf(z);
        prop_assert!((back - p).abs() < 1e-9, "Φ(Φ⁻¹({p})) = {back}");
    }

    /// The quantile must be monotonically increasing.
    #[test]
    fn quantile_monotonic(p1 in 0.001f64..0.499, delta in 0.001f64..0.499) {
        let p2 = p1 + delta;
        prop_assert!(inverse_normal_cdf(p2).unwrap() > inverse_normal_cdf(p1).unwrap());
    }

    /// Fair probabilities always stay inside [ε, 1 − ε] with σ > 0.
    #[test]
    fn fair_value_within_guard(p in 0.5f64..0.999_999, spread in 0.0f64..60.0) {
        let model = GaussianModel::default();
        let fv = model.fair_value(&normalized(p, spread)).unwrap();
        let eps = model.epsilon();
        prop_assert!(fv.sigma > 0.0 && fv.sigma.is_finite());
        prop_assert!(fv.probability >= eps && fv.probability <= 1.0 - eps);
        prop_assert!(fv.confidence > 0.0);
    }

    /// With a non-zero spread the model reproduces the market probability.
    #[test]
    fn fair_value_matches_vig_free_probability(p in 0.51f64..0.99, spread in 0.5f64..30.0) {
        let fv = GaussianModel::default().fair_value(&normalized(p, spread)).unwrap();
        prop_assert!((fv.probability - p).abs() < 1e-9, "p={p} fair={}", fv.probability);
    }
}

// ── Odds Normalization Properties ───────────────────────────

proptest! {
    /// Vig-free probabilities always sum to one.
    #[test]
    fn vig_removal_sums_to_one(a in 0.01f64..0.99, b in 0.01f64..0.99) {
        let (pa, pb) = odds::remove_vig("PROP", a, b).unwrap();
        prop_assert!((pa + pb - 1.0).abs() < 1e-12);
        prop_assert!(pa > 0.0 && pb > 0.0);
    }

    /// American favorites and underdogs map into (0, 1).
    #[test]
    fn american_odds_in_unit_interval(line in 100.0f64..5000.0, favorite in any::<bool>()) {
        let odds = if favorite { -line } else { line };
        let p = odds::implied_probability("PROP", odds).unwrap();
        prop_assert!(p > 0.0 && p < 1.0);
        prop_assert_eq!(p >= 0.5, favorite || line == 100.0);
    }
}

// ── Hodge Decomposition Properties ──────────────────────────

proptest! {
    /// ‖f‖² = ‖grad‖² + ‖curl‖² for every graph.
    #[test]
    fn pythagorean_identity_holds(edges in edge_strategy()) {
        let graph = graph_from(&edges);
        prop_assume!(graph.edge_count() > 0);
        let result = HodgeSolver::default().decompose(&graph).unwrap();
        let scale = 1.0 + result.flow_norm_sq;
        prop_assert!(result.pythagorean_gap() <= 1e-8 * scale, "gap {}", result.pythagorean_gap());
        prop_assert!(result.curl_norm_sq >= 0.0);
        prop_assert!(result.curl_ratio() <= 1.0);
    }

    /// The iterative solver honors the identity too.
    #[test]
    fn pythagorean_identity_holds_iteratively(edges in edge_strategy()) {
        let graph = graph_from(&edges);
        prop_assume!(graph.edge_count() > 0);
        let solver = HodgeSolver::new(SolverConfig {
            direct_max_nodes: 0,
            ..SolverConfig::default()
        });
        let result = solver.decompose(&graph).unwrap();
        let scale = 1.0 + result.flow_norm_sq;
        prop_assert!(result.pythagorean_gap() <= 1e-6 * scale, "gap {}", result.pythagorean_gap());
    }

    /// Flows generated by a potential carry no curl.
    #[test]
    fn potential_flows_are_curl_free(
        ratings in prop::collection::vec(-15.0f64..15.0, NODES),
        pairs in prop::collection::vec((0..NODES, 0..NODES, 0.1f64..5.0), 1..30),
    ) {
        let edges: Vec<_> = pairs
            .into_iter()
            .map(|(a, b, w)| (a, b, ratings[b] - ratings[a], w))
            .collect();
        let graph = graph_from(&edges);
        prop_assume!(graph.edge_count() > 0);
        let result = HodgeSolver::default().decompose(&graph).unwrap();
        prop_assert!(result.curl_norm() < 1e-6, "curl {}", result.curl_norm());
    }
}

// ── Decision Properties ─────────────────────────────────────

proptest! {
    /// A maker quote is always strictly below the crossing price.
    #[test]
    fn maker_price_never_crosses(
        fair in 0.05f64..0.95,
        buffer in 0.0f64..0.05,
        crossing_mills in 20i64..980,
    ) {
        let tick = dec!(0.01);
        let crossing = Decimal::new(crossing_mills, 3);
        let price = decision::maker_price(fair, buffer, crossing, tick).unwrap();
        prop_assert!(price < crossing, "maker {price} crosses {crossing}");
        prop_assert_eq!((price / tick).fract(), Decimal::ZERO);
    }

    /// Intents built from a live book never rest at or through the ask of
    /// the side bought, with the No ask taken as exactly `1 − bid`.
    #[test]
    fn maker_intent_never_crosses_either_side(
        p_home in 0.05f64..0.95,
        bid_cents in 2i64..97,
        width in 1i64..3,
    ) {
        let ask_cents = bid_cents + width;
        let mut opp = opportunity::evaluate(&fair_estimate(p_home), &book(bid_cents, ask_cents), 0.0)
            .unwrap();
        opp.action = Action::Maker;
        let engine = StrategyEngine::new(0.01, 100.0, dec!(0.01));

        if let Ok(Some(intent)) = engine.build_intent(&opp, Utc::now()) {
            let ask = match opp.side {
                Side::Yes => Decimal::new(ask_cents, 2),
                Side::No => Decimal::ONE - Decimal::new(bid_cents, 2),
            };
            prop_assert!(intent.price < ask, "{:?} maker {} crosses {ask}", opp.side, intent.price);
        }
    }

    /// A taker limit is exactly the ask of the side bought.
    #[test]
    fn taker_limit_equals_side_ask(
        p_home in 0.05f64..0.95,
        bid_cents in 2i64..97,
        width in 1i64..3,
    ) {
        let ask_cents = bid_cents + width;
        let mut opp = opportunity::evaluate(&fair_estimate(p_home), &book(bid_cents, ask_cents), 0.0)
            .unwrap();
        opp.action = Action::Taker;
        let engine = StrategyEngine::new(0.01, 100.0, dec!(0.01));

        if let Ok(Some(intent)) = engine.build_intent(&opp, Utc::now()) {
            let ask = match opp.side {
                Side::Yes => Decimal::new(ask_cents, 2),
                Side::No => Decimal::ONE - Decimal::new(bid_cents, 2),
            };
            prop_assert_eq!(intent.price, ask);
        }
    }

    /// Sizing never exceeds the cap or the visible depth.
    #[test]
    fn taker_size_respects_cap_and_depth(
        depth in 0.0f64..10_000.0,
        cap in 1.0f64..1_000.0,
        cents in 1u32..99,
    ) {
        let price = Decimal::new(i64::from(cents), 2);
        let size = decision::taker_size(depth, cap, price);
        prop_assert!(size as f64 <= depth.floor());
        prop_assert!(Decimal::from(size) * price <= Decimal::from_f64(cap).unwrap());
    }

    /// The high-opportunity regime never makes an action less aggressive.
    #[test]
    fn relaxed_regime_only_upgrades(edge in -0.1f64..0.1) {
        let thresholds = Thresholds::default();
        let calm = classify(edge, Regime::Conservative, &thresholds);
        let hot = classify(edge, Regime::HighOpportunity, &thresholds);
        let rank = |a: Action| match a {
            Action::Idle => 0,
            Action::Maker => 1,
            Action::Taker => 2,
        };
        prop_assert!(rank(hot) >= rank(calm));
    }
}
