//! Reconciliation outcome statistics.
//!
//! Counters for corrective outcomes and failure categories, tallied from a
//! finished [`crate::RunReport`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::{FailureType, OutcomeKind};

/// Outcome statistics tracker.
///
/// All outcome kinds and failure types are initialized to zero on creation,
/// so the summary always lists every category.
pub struct OutcomeStats {
    outcomes: HashMap<OutcomeKind, AtomicUsize>,
    failures: HashMap<FailureType, AtomicUsize>,
}

impl Default for OutcomeStats {
    fn default() -> Self {
        Self::new()
    }
}

impl OutcomeStats {
    pub fn new() -> Self {
        let outcomes = OutcomeKind::iter()
            .map(|kind| (kind, AtomicUsize::new(0)))
            .collect();
        let failures = FailureType::iter()
            .map(|failure| (failure, AtomicUsize::new(0)))
            .collect();
        OutcomeStats { outcomes, failures }
    }

    pub fn increment(&self, kind: OutcomeKind) {
        if let Some(counter) = self.outcomes.get(&kind) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!("Outcome counter for {:?} is not initialized", kind);
        }
    }

    /// Records a failed item and its category.
    pub fn increment_failure(&self, failure: FailureType) {
        self.increment(OutcomeKind::Failed);
        if let Some(counter) = self.failures.get(&failure) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!("Failure counter for {:?} is not initialized", failure);
        }
    }

    pub fn get(&self, kind: OutcomeKind) -> usize {
        self.outcomes
            .get(&kind)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn get_failure_count(&self, failure: FailureType) -> usize {
        self.failures
            .get(&failure)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Total items that reached any outcome.
    pub fn total(&self) -> usize {
        OutcomeKind::iter().map(|k| self.get(k)).sum()
    }

    pub fn total_failures(&self) -> usize {
        self.get(OutcomeKind::Failed)
    }
}
