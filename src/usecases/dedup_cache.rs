//! Dedup Cache - Fingerprint Suppression with TTL
//!
//! The sole guard against emitting the same logical order twice.
//! Keyed by `(event, price, side)`; an entry suppresses re-emission
//! until `ttl` has elapsed since it was recorded. Time is always
//! passed in so behavior is deterministic under test.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::decision::{EventState, TransitionError};
use crate::domain::trade::{Fingerprint, OrderStatus};

/// One cached fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupEntry {
  /// When the fingerprint was recorded.
  pub recorded_at: DateTime<Utc>,
  /// Last known lifecycle status.
  pub status: OrderStatus,
}

/// TTL-bounded fingerprint cache.
#[derive(Debug)]
pub struct DedupCache {
  ttl: chrono::Duration,
  entries: HashMap<Fingerprint, DedupEntry>,
}

impl DedupCache {
  /// Create an empty cache. A TTL beyond chrono's range saturates.
  pub fn new(ttl: Duration) -> Self {
    Self {
      ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
      entries: HashMap::new(),
    }
  }

  /// Record `fingerprint` unless a live entry exists.
  ///
  /// Returns `true` when the caller may emit. An expired entry is
  /// replaced, permitting re-submission.
  pub fn try_insert(&mut self, fingerprint: &Fingerprint, now: DateTime<Utc>) -> bool {
    if let Some(entry) = self.entries.get(fingerprint) {
      if !self.is_expired(entry, now) {
        return false;
      }
    }
    self.entries.insert(
      fingerprint.clone(),
      DedupEntry {
        recorded_at: now,
        status: OrderStatus::Submitted,
      },
    );
    true
  }

  /// Apply an execution report to a cached entry.
  ///
  /// `Rejected` removes the entry so a fresh signal can retry.
  /// Unknown fingerprints are ignored and return `Ok(None)`.
  ///
  /// # Errors
  /// `TransitionError` when the entry's status cannot move to `status`.
  pub fn mark(
    &mut self,
    fingerprint: &Fingerprint,
    status: OrderStatus,
  ) -> Result<Option<OrderStatus>, TransitionError> {
    let Some(entry) = self.entries.get_mut(fingerprint) else {
      return Ok(None);
    };
    EventState::from(entry.status).transition(EventState::from(status))?;

    if status == OrderStatus::Rejected {
      self.entries.remove(fingerprint);
    } else {
      entry.status = status;
    }
    Ok(Some(status))
  }

  /// Drop every entry older than the TTL.
  ///
  /// Entries still `Submitted` at eviction are reported `Expired`;
  /// others keep their final status.
  pub fn evict_expired(&mut self, now: DateTime<Utc>) -> Vec<(Fingerprint, OrderStatus)> {
    let ttl = self.ttl;
    let expired: Vec<Fingerprint> = self
      .entries
      .iter()
      .filter(|(_, e)| now.signed_duration_since(e.recorded_at) >= ttl)
      .map(|(fp, _)| fp.clone())
      .collect();

    expired
      .into_iter()
      .filter_map(|fp| {
        self.entries.remove(&fp).map(|e| {
          let status = match e.status {
            OrderStatus::Submitted => OrderStatus::Expired,
            other => other,
          };
          (fp, status)
        })
      })
      .collect()
  }

  /// Remove everything, reporting entries still awaiting an outcome.
  pub fn drain_open(&mut self) -> Vec<Fingerprint> {
    self
      .entries
      .drain()
      .filter(|(_, e)| e.status == OrderStatus::Submitted)
      .map(|(fp, _)| fp)
      .collect()
  }

  pub fn get(&self, fingerprint: &Fingerprint) -> Option<&DedupEntry> {
    self.entries.get(fingerprint)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  fn is_expired(&self, entry: &DedupEntry, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(entry.recorded_at) >= self.ttl
  }
}
