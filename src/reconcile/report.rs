//! Diff and outcome reporting.

use log::info;
use strum::IntoEnumIterator;

use crate::collector::{CollectionKind, ItemOutcome};
use crate::diff::{Change, DiffResult};
use crate::error_handling::{FailureType, OutcomeKind, OutcomeStats};
use crate::model::{FieldValue, Fingerprint};

/// Result of one reconciliation step.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub collection: CollectionKind,
    pub missing: usize,
    pub changed: usize,
    pub extra: usize,
    /// One per dispatched diff item; empty on a dry run
    pub outcomes: Vec<ItemOutcome>,
}

impl SyncReport {
    pub fn new(collection: CollectionKind) -> Self {
        SyncReport {
            collection,
            missing: 0,
            changed: 0,
            extra: 0,
            outcomes: Vec::new(),
        }
    }

    pub fn from_diff(collection: CollectionKind, diff: &DiffResult) -> Self {
        SyncReport {
            missing: diff.missing.len(),
            changed: diff.changes.len(),
            extra: diff.extra.len(),
            ..Self::new(collection)
        }
    }

    pub fn extend(&mut self, outcomes: impl IntoIterator<Item = ItemOutcome>) {
        self.outcomes.extend(outcomes);
    }

    /// True when the two sides already agreed.
    pub fn in_sync(&self) -> bool {
        self.missing == 0 && self.changed == 0 && self.extra == 0
    }

    pub fn record_into(&self, stats: &OutcomeStats) {
        for outcome in &self.outcomes {
            match outcome.failure {
                Some(failure) => stats.increment_failure(failure),
                None => stats.increment(outcome.kind()),
            }
        }
    }
}

/// Every step of one run, in execution order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub dry_run: bool,
    pub steps: Vec<SyncReport>,
}

impl RunReport {
    pub fn new(dry_run: bool) -> Self {
        RunReport {
            dry_run,
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, step: SyncReport) {
        self.steps.push(step);
    }

    pub fn stats(&self) -> OutcomeStats {
        let stats = OutcomeStats::new();
        for step in &self.steps {
            step.record_into(&stats);
        }
        stats
    }

    pub fn has_failures(&self) -> bool {
        self.steps
            .iter()
            .flat_map(|step| &step.outcomes)
            .any(|outcome| outcome.failure.is_some())
    }

    /// Logs per-step diff counts, outcome counts and failure categories.
    pub fn log_summary(&self) {
        for step in &self.steps {
            info!(
                "{}: {} missing, {} changed, {} extra",
                step.collection, step.missing, step.changed, step.extra
            );
        }
        if self.dry_run {
            info!("Dry run: no changes applied");
            return;
        }

        let stats = self.stats();
        if stats.total() == 0 {
            return;
        }
        info!("Outcome Counts ({} total):", stats.total());
        for kind in OutcomeKind::iter() {
            let count = stats.get(kind);
            if count > 0 {
                info!("   {}: {}", kind.as_str(), count);
            }
        }
        if stats.total_failures() > 0 {
            info!("Failure Counts ({} total):", stats.total_failures());
            for failure in FailureType::iter() {
                let count = stats.get_failure_count(failure);
                if count > 0 {
                    info!("   {}: {}", failure.as_str(), count);
                }
            }
        }
    }
}

fn describe_fingerprint(fingerprint: &Fingerprint) -> String {
    fingerprint
        .fields()
        .map(|(field, value)| format!("{field}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `field: old -> new` pairs of one change.
pub fn describe_change(change: &Change) -> String {
    change
        .fields
        .iter()
        .map(|(field, new)| {
            let old = change.fingerprint.get(field).unwrap_or(&FieldValue::Null);
            format!("{field}: {old} -> {new}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Logs every proposed change of a diff.
pub fn log_proposed_changes(collection: CollectionKind, diff: &DiffResult) {
    info!(
        "{collection}: {} missing, {} changed, {} extra",
        diff.missing.len(),
        diff.changes.len(),
        diff.extra.len()
    );
    for (key, fingerprint) in &diff.missing {
        info!("MISSING: {collection} ({key}): {}", describe_fingerprint(fingerprint));
    }
    for (key, change) in &diff.changes {
        info!("DIFF: {collection} ({key}): {}", describe_change(change));
    }
    for key in diff.extra.keys() {
        info!("EXTRA: {collection} ({key})");
    }
}
