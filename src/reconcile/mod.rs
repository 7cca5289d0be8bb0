//! Reconciliation driver: fetch, diff, report, dispatch.
//!
//! [`reconcile`] runs one collection pair end to end. Entity tasks in
//! [`tasks`] chain several of them into ordered pipelines.

mod devices;
mod report;
pub mod tasks;

use std::collections::BTreeSet;

use log::info;

use crate::collector::{Collector, FetchParams, ItemOutcome, KeyOptions, SyncContext};
use crate::diff::{diff, DiffResult, FieldComparators};
use crate::error_handling::ReconcileError;
use crate::model::Fingerprint;

pub use report::{describe_change, log_proposed_changes, RunReport, SyncReport};

/// How the sync target is fetched.
pub enum TargetFetch {
    /// Fetched concurrently with the source of truth.
    Independent(Vec<FetchParams>),
    /// One fetch per distinct parameter set derived from the source of
    /// truth's fingerprints (e.g. one per hostname).
    PerSourceKey(fn(&Fingerprint) -> FetchParams),
}

pub struct FetchPlan {
    pub source: Vec<FetchParams>,
    pub target: TargetFetch,
}

impl FetchPlan {
    /// Fetch everything from both sides.
    pub fn all() -> Self {
        FetchPlan {
            source: vec![FetchParams::default()],
            target: TargetFetch::Independent(vec![FetchParams::default()]),
        }
    }
}

/// What the target does with keys the source of truth does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtraPolicy {
    #[default]
    Ignore,
    Remove,
}

/// Per-collection diff and dispatch settings.
#[derive(Default)]
pub struct SyncPlan {
    pub comparators: FieldComparators,
    pub extra: ExtraPolicy,
}

/// Fetches both sides, indexes them and diffs.
///
/// Returns `None` when the two sides agree. Proposed changes are logged.
pub async fn compare(
    source_from: &mut dyn Collector,
    sync_to: &mut dyn Collector,
    fetch: FetchPlan,
    plan: &SyncPlan,
    ctx: &SyncContext<'_>,
) -> Result<Option<DiffResult>, ReconcileError> {
    let limit = ctx.limit();
    match fetch.target {
        TargetFetch::Independent(target) => {
            tokio::try_join!(
                source_from.fetch_each(fetch.source, limit),
                sync_to.fetch_each(target, limit),
            )?;
            source_from.make_keys(&KeyOptions::default())?;
        }
        TargetFetch::PerSourceKey(derive) => {
            source_from.fetch_each(fetch.source, limit).await?;
            source_from.make_keys(&KeyOptions::default())?;
            let params: BTreeSet<FetchParams> =
                source_from.inventory().keys().values().map(derive).collect();
            sync_to.fetch_each(params.into_iter().collect(), limit).await?;
        }
    }
    sync_to.make_keys(&KeyOptions::default())?;

    info!(
        "{}: {} {} records, {} {} records",
        source_from.kind(),
        source_from.source(),
        source_from.inventory().len(),
        sync_to.source(),
        sync_to.inventory().len()
    );

    let result = diff(
        source_from.inventory(),
        sync_to.inventory(),
        Some(&plan.comparators),
    );
    match &result {
        Some(diff) => log_proposed_changes(source_from.kind(), diff),
        None => info!("{}: no changes required", source_from.kind()),
    }
    Ok(result)
}

/// Dispatches the corrective operations of a diff against `sync_to`.
///
/// Creates and updates run concurrently; extras are handled afterwards per
/// the plan's [`ExtraPolicy`]. Successful creates are merged back into the
/// target's index.
pub async fn apply(
    diff: &DiffResult,
    sync_to: &mut dyn Collector,
    plan: &SyncPlan,
    ctx: &SyncContext<'_>,
) -> Result<Vec<ItemOutcome>, ReconcileError> {
    let target: &dyn Collector = &*sync_to;
    let (created, updated) = tokio::try_join!(
        async {
            if diff.missing.is_empty() {
                Ok(Vec::new())
            } else {
                target.create_missing(&diff.missing, ctx).await
            }
        },
        async {
            if diff.changes.is_empty() {
                Ok(Vec::new())
            } else {
                target.update_changes(&diff.changes, ctx).await
            }
        },
    )?;

    let removed = match plan.extra {
        ExtraPolicy::Remove if !diff.extra.is_empty() => {
            target.remove_extra(&diff.extra, ctx).await?
        }
        ExtraPolicy::Remove => Vec::new(),
        ExtraPolicy::Ignore => {
            if !diff.extra.is_empty() {
                info!(
                    "{}: leaving {} extra records in {}",
                    target.kind(),
                    diff.extra.len(),
                    target.source()
                );
            }
            Vec::new()
        }
    };

    sync_to.absorb(&created)?;

    let mut outcomes = created;
    outcomes.extend(updated);
    outcomes.extend(removed);
    Ok(outcomes)
}

/// [`compare`], then [`apply`] unless this is a dry run.
pub async fn reconcile(
    source_from: &mut dyn Collector,
    sync_to: &mut dyn Collector,
    fetch: FetchPlan,
    plan: &SyncPlan,
    ctx: &SyncContext<'_>,
) -> Result<SyncReport, ReconcileError> {
    let kind = source_from.kind();
    let Some(diff) = compare(source_from, sync_to, fetch, plan, ctx).await? else {
        return Ok(SyncReport::new(kind));
    };
    let mut report = SyncReport::from_diff(kind, &diff);
    if ctx.options.dry_run {
        return Ok(report);
    }
    report.extend(apply(&diff, sync_to, plan, ctx).await?);
    Ok(report)
}
