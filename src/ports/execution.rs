//! Order Execution Port - Intent Submission Interface
//!
//! Defines the trait the engine hands order intents to. Submission is
//! at-least-once at this boundary; duplicate suppression happens in the
//! engine's dedup cache before `submit` is ever called.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::trade::OrderIntent;

/// Result of an intent submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReport {
  /// Whether the venue accepted the order.
  pub accepted: bool,
  /// Venue-assigned order id, when accepted.
  pub venue_order_id: Option<String>,
  /// Rejection reason if not accepted.
  pub rejection_reason: Option<String>,
}

impl SubmissionReport {
  /// An accepted submission.
  pub fn accepted(venue_order_id: impl Into<String>) -> Self {
    Self {
      accepted: true,
      venue_order_id: Some(venue_order_id.into()),
      rejection_reason: None,
    }
  }

  /// A rejected submission.
  pub fn rejected(reason: impl Into<String>) -> Self {
    Self {
      accepted: false,
      venue_order_id: None,
      rejection_reason: Some(reason.into()),
    }
  }
}

/// Trait for the execution collaborator.
///
/// Implementors dispatch on `intent.style` (maker vs taker) and own
/// signing, authentication and network retries.
#[async_trait]
pub trait OrderExecution: Send + Sync + 'static {
  /// Submit one intent.
  ///
  /// # Errors
  /// Returns error on transport failure. A venue-side rejection is an
  /// `Ok` report with `accepted == false`.
  async fn submit(&self, intent: &OrderIntent) -> anyhow::Result<SubmissionReport>;
}
