//! Domain layer - pricing math and decision rules.
//!
//! Pure, synchronous code: no I/O, no clocks, no logging. Every
//! function here is a deterministic function of its arguments so the
//! use cases can evaluate events independently and in parallel.
//!
//! Pipeline per cycle:
//! `odds` → `gaussian` → (`graph` → `hodge` → `regime`) → `opportunity` → `decision`

pub mod decision;
pub mod error;
pub mod gaussian;
pub mod graph;
pub mod hodge;
pub mod odds;
pub mod opportunity;
pub mod regime;
pub mod trade;

// Re-export core types for convenience
pub use decision::{Action, EventState, Thresholds, TransitionError, classify};
pub use error::{PricingError, PricingResult};
pub use gaussian::{FairValueEstimate, GaussianModel, SigmaBand};
pub use graph::{Edge, MarketGraph};
pub use hodge::{HodgeResult, HodgeSolver, SolveMethod, SolverConfig};
pub use odds::NormalizedOdds;
pub use opportunity::Opportunity;
pub use regime::{Regime, RegimeDetector};
pub use trade::{
    ContractId, EventId, ExecutionStyle, Fingerprint, MarketQuote, OddsQuote, OrderIntent,
    OrderStatus, Side,
};
