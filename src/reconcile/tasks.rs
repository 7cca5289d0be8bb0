//! Entity reconciliation tasks.
//!
//! Each task reconciles one collection from IP Fabric into Netbox. Apart from
//! sites, tasks need a [`Scope`]: an IP Fabric filter expression or a list
//! of device hostnames.

use std::collections::BTreeSet;

use log::info;

use super::{apply, compare, ExtraPolicy, FetchPlan, SyncPlan, SyncReport, TargetFetch};
use crate::collector::{
    CollectionKind, Collector, FetchParams, KeyOptions, SyncContext, SyncOptions,
};
use crate::diff::DiffResult;
use crate::error_handling::ReconcileError;
use crate::model::Fingerprint;
use crate::registry;
use crate::sources::{Sources, SourceKind};

pub use super::devices::ensure_devices;

/// Which devices a task acts on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    /// IP Fabric filter expression; takes precedence over `hostnames`
    pub filter: Option<String>,
    /// IP Fabric device hostnames
    pub hostnames: Vec<String>,
}

impl Scope {
    pub fn new(filter: Option<String>, hostnames: Vec<String>) -> Self {
        Scope { filter, hostnames }
    }

    pub fn hostnames(hostnames: Vec<String>) -> Self {
        Scope {
            filter: None,
            hostnames,
        }
    }

    /// IP Fabric fetch parameters: the filter, else one fetch per hostname.
    pub fn ipfabric_params(&self, what: &'static str) -> Result<Vec<FetchParams>, ReconcileError> {
        if let Some(filter) = &self.filter {
            return Ok(vec![FetchParams::filter(filter.as_str())]);
        }
        if !self.hostnames.is_empty() {
            return Ok(self.hostnames.iter().map(FetchParams::hostname).collect());
        }
        Err(ReconcileError::MissingParameters(what))
    }
}

/// Netbox fetch for the device a fingerprint belongs to.
pub(crate) fn by_hostname(fingerprint: &Fingerprint) -> FetchParams {
    FetchParams::hostname(fingerprint.text("hostname"))
}

/// Hostnames touched by the missing and changed items of a diff.
fn diff_hostnames(diff: &DiffResult) -> BTreeSet<FetchParams> {
    diff.missing
        .values()
        .chain(diff.changes.values().map(|change| &change.fingerprint))
        .map(by_hostname)
        .collect()
}

/// Fetches and indexes the Netbox interfaces of the devices in `params`.
async fn netbox_interfaces(
    sources: &Sources,
    params: BTreeSet<FetchParams>,
    limit: usize,
) -> Result<Box<dyn Collector>, ReconcileError> {
    let mut interfaces = registry::collector(sources, SourceKind::Netbox, CollectionKind::Interfaces)?;
    interfaces
        .fetch_each(params.into_iter().collect(), limit)
        .await?;
    interfaces.make_keys(&KeyOptions::default())?;
    Ok(interfaces)
}

/// Ensures every IP Fabric site exists in Netbox.
pub async fn ensure_sites(
    sources: &Sources,
    options: &SyncOptions,
) -> Result<SyncReport, ReconcileError> {
    info!("Ensure Netbox contains the sites defined in IP Fabric");
    let mut ipf = registry::collector(sources, SourceKind::IpFabric, CollectionKind::Sites)?;
    let mut nb = registry::collector(sources, SourceKind::Netbox, CollectionKind::Sites)?;
    let ctx = SyncContext::new(options);
    super::reconcile(&mut *ipf, &mut *nb, FetchPlan::all(), &SyncPlan::default(), &ctx).await
}

/// Ensures device interfaces exist and carry the IP Fabric description.
pub async fn ensure_interfaces(
    sources: &Sources,
    options: &SyncOptions,
    scope: &Scope,
) -> Result<SyncReport, ReconcileError> {
    info!("Ensure device interfaces");
    let fetch = FetchPlan {
        source: scope.ipfabric_params("interfaces need a filter expression or device hostnames")?,
        target: TargetFetch::PerSourceKey(by_hostname),
    };
    let mut ipf = registry::collector(sources, SourceKind::IpFabric, CollectionKind::Interfaces)?;
    let mut nb = registry::collector(sources, SourceKind::Netbox, CollectionKind::Interfaces)?;
    let ctx = SyncContext::new(options);
    super::reconcile(&mut *ipf, &mut *nb, fetch, &SyncPlan::default(), &ctx).await
}

/// Ensures interface IP addresses exist and are bound to the right interface.
pub async fn ensure_ipaddrs(
    sources: &Sources,
    options: &SyncOptions,
    scope: &Scope,
) -> Result<SyncReport, ReconcileError> {
    info!("Ensure interface IP addresses");
    let fetch = FetchPlan {
        source: scope.ipfabric_params("ipaddrs need a filter expression or device hostnames")?,
        target: TargetFetch::PerSourceKey(by_hostname),
    };
    let plan = SyncPlan::default();
    reconcile_with_interfaces(sources, options, CollectionKind::IpAddrs, fetch, &plan).await
}

/// Ensures LAG memberships; members Netbox has but IP Fabric does not are unlinked.
pub async fn ensure_lags(
    sources: &Sources,
    options: &SyncOptions,
    scope: &Scope,
) -> Result<SyncReport, ReconcileError> {
    info!("Ensure device LAG member interfaces");
    let fetch = FetchPlan {
        source: scope.ipfabric_params("lags need a filter expression or device hostnames")?,
        target: TargetFetch::PerSourceKey(by_hostname),
    };
    let plan = SyncPlan {
        extra: ExtraPolicy::Remove,
        ..SyncPlan::default()
    };
    reconcile_with_interfaces(sources, options, CollectionKind::PortChannels, fetch, &plan).await
}

/// Reconciles a collection whose corrective operations refer to Netbox interfaces.
async fn reconcile_with_interfaces(
    sources: &Sources,
    options: &SyncOptions,
    kind: CollectionKind,
    fetch: FetchPlan,
    plan: &SyncPlan,
) -> Result<SyncReport, ReconcileError> {
    let mut ipf = registry::collector(sources, SourceKind::IpFabric, kind)?;
    let mut nb = registry::collector(sources, SourceKind::Netbox, kind)?;
    let ctx = SyncContext::new(options);

    let Some(diff) = compare(&mut *ipf, &mut *nb, fetch, plan, &ctx).await? else {
        return Ok(SyncReport::new(kind));
    };
    let mut report = SyncReport::from_diff(kind, &diff);
    if options.dry_run {
        return Ok(report);
    }

    let interfaces = netbox_interfaces(sources, diff_hostnames(&diff), ctx.limit()).await?;
    let ctx = ctx.with_interfaces(interfaces.inventory());
    report.extend(apply(&diff, &mut *nb, plan, &ctx).await?);
    Ok(report)
}

/// Devices, then interfaces, addresses and LAGs of the devices found.
pub async fn onboard(
    sources: &Sources,
    options: &SyncOptions,
    scope: &Scope,
) -> Result<Vec<SyncReport>, ReconcileError> {
    let (devices, hostnames) = ensure_devices(sources, options, scope).await?;
    let mut reports = vec![devices];
    if hostnames.is_empty() {
        info!("No IP Fabric devices matched; nothing to onboard");
        return Ok(reports);
    }

    let scope = Scope::hostnames(hostnames);
    reports.push(ensure_interfaces(sources, options, &scope).await?);
    reports.push(ensure_ipaddrs(sources, options, &scope).await?);
    reports.push(ensure_lags(sources, options, &scope).await?);
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Change;
    use crate::model::Key;
    use std::collections::BTreeMap;

    #[test]
    fn test_scope_prefers_filter() {
        let scope = Scope::new(Some("siteName = atl1".into()), vec!["sw1".into()]);
        assert_eq!(
            scope.ipfabric_params("x").unwrap(),
            vec![FetchParams::filter("siteName = atl1")]
        );
    }

    #[test]
    fn test_scope_one_fetch_per_hostname() {
        let scope = Scope::hostnames(vec!["sw1".into(), "sw2".into()]);
        assert_eq!(
            scope.ipfabric_params("x").unwrap(),
            vec![FetchParams::hostname("sw1"), FetchParams::hostname("sw2")]
        );
    }

    #[test]
    fn test_empty_scope_is_missing_parameters() {
        let err = Scope::default().ipfabric_params("lags need a scope").unwrap_err();
        assert!(matches!(err, ReconcileError::MissingParameters("lags need a scope")));
    }

    #[test]
    fn test_diff_hostnames_dedupes() {
        let mut diff = DiffResult::default();
        diff.missing.insert(
            Key::from(["sw1", "Ethernet1"]),
            Fingerprint::new().with("hostname", "sw1"),
        );
        diff.missing.insert(
            Key::from(["sw1", "Ethernet2"]),
            Fingerprint::new().with("hostname", "sw1"),
        );
        diff.changes.insert(
            Key::from(["sw2", "Ethernet1"]),
            Change {
                fingerprint: Fingerprint::new().with("hostname", "sw2"),
                fields: BTreeMap::new(),
            },
        );
        let hosts: Vec<FetchParams> = diff_hostnames(&diff).into_iter().collect();
        assert_eq!(
            hosts,
            vec![FetchParams::hostname("sw1"), FetchParams::hostname("sw2")]
        );
    }
}
