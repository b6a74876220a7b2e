//! Gaussian fair-value model.
//!
//! The favorite's terminal score differential is modelled as
//! X ~ N(μ, σ²) with μ = |spread|. σ is back-solved from how heavily
//! the vig-free moneyline favors the expected winner:
//!
//!   σ = spread / Φ⁻¹(1 − P_fav)        (spread ≤ 0, so σ > 0)
//!
//! and the binary "favorite wins" contract is worth Φ(μ/σ).
//!
//! Both Φ and Φ⁻¹ are closed-form rational approximations, with no root
//! finding on the hot path:
//! - Φ⁻¹: Wichura (1988), AS241 `PPND16`, ~1e-16 relative accuracy
//! - Φ:   Hart (1968) via West (2005), double precision

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{PricingError, PricingResult};
use super::odds::NormalizedOdds;
use super::trade::EventId;

// ── Standard normal ──────────────────────────────────────────────────

const SPLIT_CENTRAL: f64 = 0.425;
const SPLIT_TAIL: f64 = 5.0;
const CONST_CENTRAL: f64 = 0.180_625;
const CONST_TAIL: f64 = 1.6;

const A: [f64; 8] = [
    3.387_132_872_796_366_608_0,
    1.331_416_678_917_843_774_5e2,
    1.971_590_950_306_551_442_7e3,
    1.373_169_376_550_946_112_5e4,
    4.592_195_393_154_987_145_7e4,
    6.726_577_092_700_870_085_3e4,
    3.343_057_558_358_812_810_5e4,
    2.509_080_928_730_122_672_7e3,
];
const B: [f64; 8] = [
    1.0,
    4.231_333_070_160_091_125_2e1,
    6.871_870_074_920_579_083_0e2,
    5.394_196_021_424_751_107_7e3,
    2.121_379_430_158_659_586_7e4,
    3.930_789_580_009_271_061_0e4,
    2.872_908_573_572_194_267_4e4,
    5.226_495_278_852_854_561_0e3,
];
const C: [f64; 8] = [
    1.423_437_110_749_683_577_34,
    4.630_337_846_156_545_295_90,
    5.769_497_221_460_691_405_50,
    3.647_848_324_763_204_605_04,
    1.270_458_252_452_368_382_58,
    2.417_807_251_774_506_117_70e-1,
    2.272_384_498_926_918_458_33e-2,
    7.745_450_142_783_414_076_40e-4,
];
const D: [f64; 8] = [
    1.0,
    2.053_191_626_637_758_821_87,
    1.676_384_830_183_803_849_40,
    6.897_673_349_851_000_045_50e-1,
    1.481_039_764_274_800_745_90e-1,
    1.519_866_656_361_645_719_66e-2,
    5.475_938_084_995_344_946_00e-4,
    1.050_750_071_644_416_843_24e-9,
];
const E: [f64; 8] = [
    6.657_904_643_501_103_777_20,
    5.463_784_911_164_114_369_90,
    1.784_826_539_917_291_335_80,
    2.965_605_718_285_048_912_30e-1,
    2.653_218_952_657_612_309_30e-2,
    1.242_660_947_388_078_438_60e-3,
    2.711_555_568_743_487_578_15e-5,
    2.010_334_399_292_288_132_65e-7,
];
const F: [f64; 8] = [
    1.0,
    5.998_322_065_558_879_376_90e-1,
    1.369_298_809_227_358_053_10e-1,
    1.487_536_129_085_061_485_25e-2,
    7.868_691_311_456_132_591_00e-4,
    1.846_318_317_510_054_681_80e-5,
    1.421_511_758_316_445_888_70e-7,
    2.044_263_103_389_939_785_64e-15,
];

/// Horner evaluation, coefficients in ascending degree.
fn polynomial(coeffs: &[f64; 8], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc.mul_add(x, *c))
}

/// Standard normal quantile Φ⁻¹(p).
///
/// # Errors
/// `Domain` when `p` is not strictly inside (0, 1).
pub fn inverse_normal_cdf(p: f64) -> PricingResult<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(PricingError::Domain(format!(
            "normal quantile undefined for p = {p}"
        )));
    }

    let q = p - 0.5;
    if q.abs() <= SPLIT_CENTRAL {
        let r = CONST_CENTRAL - q * q;
        return Ok(q * polynomial(&A, r) / polynomial(&B, r));
    }

    let tail = if q < 0.0 { p } else { 1.0 - p };
    let r = (-tail.ln()).sqrt();
    let x = if r <= SPLIT_TAIL {
        let r = r - CONST_TAIL;
        polynomial(&C, r) / polynomial(&D, r)
    } else {
        let r = r - SPLIT_TAIL;
        polynomial(&E, r) / polynomial(&F, r)
    };

    Ok(if q < 0.0 { -x } else { x })
}

/// Standard normal CDF Φ(x).
pub fn normal_cdf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    let ax = x.abs();
    let lower_tail = if ax > 37.0 {
        0.0
    } else {
        let e = (-0.5 * ax * ax).exp();
        if ax < 7.071_067_811_865_47 {
            let num = [
                3.526_249_659_989_11e-2,
                0.700_383_064_443_688,
                6.373_962_203_531_65,
                33.912_866_078_383,
                112.079_291_497_871,
                221.213_596_169_931,
                220.206_867_912_376,
            ]
            .iter()
            .fold(0.0_f64, |acc, c| acc.mul_add(ax, *c));
            let den = [
                8.838_834_764_831_84e-2,
                1.755_667_163_182_64,
                16.064_177_579_207,
                86.780_732_202_946_1,
                296.564_248_779_674,
                637.333_633_378_831,
                793.826_512_519_948,
                440.413_735_824_752,
            ]
            .iter()
            .fold(0.0_f64, |acc, c| acc.mul_add(ax, *c));
            e * num / den
        } else {
            let mut b = ax + 0.65;
            b = ax + 4.0 / b;
            b = ax + 3.0 / b;
            b = ax + 2.0 / b;
            b = ax + 1.0 / b;
            e / b / 2.506_628_274_631
        }
    };

    if x > 0.0 { 1.0 - lower_tail } else { lower_tail }
}

/// Survival function 1 − Φ(x), evaluated without cancellation.
pub fn normal_sf(x: f64) -> f64 {
    normal_cdf(-x)
}

// ── Fair value ───────────────────────────────────────────────────────

/// Model-derived price of an event, immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairValueEstimate {
    pub event_id: EventId,
    pub favorite: String,
    pub underdog: String,
    /// Expected margin of the favorite.
    pub mu: f64,
    /// Score-differential volatility (> 0).
    pub sigma: f64,
    /// P(favorite wins), within [ε, 1 − ε].
    pub probability: f64,
    /// Inverse variance, used as the graph edge weight.
    pub confidence: f64,
    pub source: String,
    /// Timestamp of the odds this was derived from.
    pub observed_at: DateTime<Utc>,
}

impl FairValueEstimate {
    /// Fair price of a "yes" contract paying on `outcome`.
    ///
    /// # Errors
    /// `Data` when `outcome` is neither team.
    pub fn probability_for(&self, outcome: &str) -> PricingResult<f64> {
        if outcome == self.favorite {
            Ok(self.probability)
        } else if outcome == self.underdog {
            Ok(1.0 - self.probability)
        } else {
            Err(PricingError::data(
                &self.event_id,
                format!(
                    "contract outcome {outcome} matches neither {} nor {}",
                    self.favorite, self.underdog
                ),
            ))
        }
    }
}

/// Optional plausibility band for σ; values outside use the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SigmaBand {
    pub min: f64,
    pub max: f64,
}

/// Spread + moneyline → (μ, σ) → fair probability.
#[derive(Debug, Clone)]
pub struct GaussianModel {
    /// Probabilities are kept within [ε, 1 − ε].
    epsilon: f64,
    /// Φ⁻¹(1 − ε), the largest z the model will emit.
    z_max: f64,
    /// σ for coin-flip / pick'em lines and band violations.
    fallback_sigma: f64,
    sigma_band: Option<SigmaBand>,
}

impl GaussianModel {
    /// Creates a model with the given saturation guard and fallback σ.
    ///
    /// # Panics
    /// Panics if `epsilon` is not in (0, 0.5) or `fallback_sigma` is not
    /// positive. Both are validated at config load.
    pub fn new(epsilon: f64, fallback_sigma: f64) -> Self {
        assert!(
            epsilon > 0.0 && epsilon < 0.5,
            "probability epsilon must be in (0, 0.5)"
        );
        assert!(fallback_sigma > 0.0, "fallback sigma must be positive");
        // In range by the assertion above.
        let z_max = inverse_normal_cdf(1.0 - epsilon).unwrap_or(f64::MAX);
        Self {
            epsilon,
            z_max,
            fallback_sigma,
            sigma_band: None,
        }
    }

    /// Enables the σ plausibility band.
    #[must_use]
    pub const fn with_sigma_band(mut self, band: SigmaBand) -> Self {
        self.sigma_band = Some(band);
        self
    }

    pub const fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Back-solve (μ, σ) from a normalized quote.
    ///
    /// # Errors
    /// `Domain` when the favorite probability is 0 or 1 (quantile undefined).
    pub fn solve_parameters(&self, odds: &NormalizedOdds) -> PricingResult<(f64, f64)> {
        let p = odds.favorite_probability;
        let z = inverse_normal_cdf(1.0 - p).map_err(|e| e.for_event(&odds.event_id))?;
        let mu = odds.spread_magnitude;

        let mut sigma = if mu == 0.0 || z.abs() < f64::EPSILON {
            self.fallback_sigma
        } else {
            (odds.canonical_spread / z).abs()
        };

        if !sigma.is_finite() {
            sigma = self.fallback_sigma;
        }

        if let Some(band) = self.sigma_band {
            if !(sigma > band.min && sigma < band.max) {
                sigma = self.fallback_sigma;
            }
        }

        // Keep μ/σ ≤ Φ⁻¹(1 − ε) so the price never saturates.
        let sigma_floor = mu / self.z_max;
        Ok((mu, sigma.max(sigma_floor)))
    }

    /// P(X > threshold) for X ~ N(μ, σ²), clamped to [ε, 1 − ε].
    pub fn binary_probability(&self, mu: f64, sigma: f64, threshold: f64) -> f64 {
        normal_sf((threshold - mu) / sigma).clamp(self.epsilon, 1.0 - self.epsilon)
    }

    /// Full pricing of one event.
    ///
    /// # Errors
    /// `Domain` when the quantile is undefined for the quote.
    pub fn fair_value(&self, odds: &NormalizedOdds) -> PricingResult<FairValueEstimate> {
        let (mu, sigma) = self.solve_parameters(odds)?;
        let probability = self.binary_probability(mu, sigma, 0.0);

        Ok(FairValueEstimate {
            event_id: odds.event_id.clone(),
            favorite: odds.favorite.clone(),
            underdog: odds.underdog.clone(),
            mu,
            sigma,
            probability,
            confidence: 1.0 / (sigma * sigma),
            source: odds.source.clone(),
            observed_at: odds.timestamp,
        })
    }
}

impl Default for GaussianModel {
    fn default() -> Self {
        Self::new(1e-6, 13.5)
    }
}
