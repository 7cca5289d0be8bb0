//! Device reconciliation and the primary-IP pipeline.
//!
//! A device's primary IP needs the management interface and address to exist
//! in Netbox first, so devices that are created (or lack a primary IP) go
//! through an extra pipeline after the device records are in place:
//!
//! 1. fetch the IP Fabric address record matching the device's login IP,
//! 2. fetch the IP Fabric interface that address is on,
//! 3. create whichever of the two Netbox is missing,
//! 4. patch the device's `primary_ip4`.

use std::collections::{BTreeMap, BTreeSet};

use log::{info, warn};

use super::tasks::{by_hostname, Scope};
use super::{compare, log_proposed_changes, FetchPlan, SyncPlan, SyncReport, TargetFetch};
use crate::collector::{
    CollectionKind, Collector, FetchParams, Inventory, ItemOutcome, KeyOptions, SyncContext,
    SyncOptions,
};
use crate::diff::{diff, Change, Comparator, DiffResult, FieldComparators};
use crate::error_handling::ReconcileError;
use crate::model::{opt_text_at, FieldValue, Fingerprint, Key};
use crate::registry;
use crate::sources::{SourceKind, Sources};

/// Ensures Netbox has the IP Fabric devices in scope, keyed by serial number.
///
/// Returns the report and the IP Fabric hostnames of every device in scope,
/// for scoping later steps.
pub async fn ensure_devices(
    sources: &Sources,
    options: &SyncOptions,
    scope: &Scope,
) -> Result<(SyncReport, Vec<String>), ReconcileError> {
    info!("Ensure devices");
    let fetch = FetchPlan {
        source: scope.ipfabric_params("devices need a filter expression or device hostnames")?,
        target: TargetFetch::Independent(vec![FetchParams::default()]),
    };
    let plan = SyncPlan {
        comparators: FieldComparators::from([("model".to_string(), Comparator::ignore())]),
        ..SyncPlan::default()
    };

    let mut ipf = registry::collector(sources, SourceKind::IpFabric, CollectionKind::Devices)?;
    let mut nb = registry::collector(sources, SourceKind::Netbox, CollectionKind::Devices)?;
    let ctx = SyncContext::new(options);

    let found = compare(&mut *ipf, &mut *nb, fetch, &plan, &ctx).await?;
    let hostnames = ipfabric_hostnames(ipf.inventory());
    let Some(mut diff) = found else {
        return Ok((SyncReport::new(CollectionKind::Devices), hostnames));
    };
    let mut report = SyncReport::from_diff(CollectionKind::Devices, &diff);
    if options.dry_run {
        return Ok((report, hostnames));
    }

    let mut primary = split_primary_ip_changes(&mut diff.changes, options.force_primary_ip);

    let target: &dyn Collector = &*nb;
    let (created, updated) = tokio::try_join!(
        async {
            if diff.missing.is_empty() {
                Ok(Vec::new())
            } else {
                target.create_missing(&diff.missing, &ctx).await
            }
        },
        async {
            if diff.changes.is_empty() {
                Ok(Vec::new())
            } else {
                target.update_changes(&diff.changes, &ctx).await
            }
        },
    )?;
    nb.absorb(&created)?;

    for outcome in created.iter().filter(|o| o.is_success()) {
        if let Some(fp) = diff.missing.get(&outcome.key) {
            let ip = fp.text("ipaddr");
            if !ip.is_empty() {
                info!("device {}: creating primary IP {ip}", fp.text("hostname"));
                primary.insert(outcome.key.clone(), ip.to_string());
            }
        }
    }
    report.extend(created);
    report.extend(updated);

    if !primary.is_empty() {
        let outcomes = ensure_primary_ips(sources, ipf.inventory(), &*nb, &primary, options).await?;
        report.extend(outcomes);
    }
    Ok((report, hostnames))
}

/// Hostnames of the IP Fabric device records, as IP Fabric reports them.
fn ipfabric_hostnames(devices: &Inventory) -> Vec<String> {
    devices
        .keys()
        .keys()
        .filter_map(|key| devices.source_record(key))
        .filter_map(|rec| opt_text_at(rec, "hostname"))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Removes `ipaddr` from every change and returns the primary IPs to assign.
///
/// An IP Fabric address is assigned when Netbox has no primary IP, or when
/// `force` is set. Changes left without fields are dropped.
pub(crate) fn split_primary_ip_changes(
    changes: &mut BTreeMap<Key, Change>,
    force: bool,
) -> BTreeMap<Key, String> {
    let mut primary = BTreeMap::new();
    changes.retain(|key, change| {
        if let Some(ip) = change.fields.remove("ipaddr") {
            let unset = change.fingerprint.text("ipaddr").is_empty();
            match ip.as_text() {
                Some(ip) if !ip.is_empty() && (unset || force) => {
                    primary.insert(key.clone(), ip.to_string());
                }
                _ => info!(
                    "device {}: keeping primary IP {} (use --force-primary-ip to replace)",
                    change.fingerprint.text("hostname"),
                    change.fingerprint.text("ipaddr")
                ),
            }
        }
        !change.fields.is_empty()
    });
    primary
}

/// Creates the management interface and address of each device in `primary`
/// and assigns the address as the device's primary IP.
async fn ensure_primary_ips(
    sources: &Sources,
    ipf_devices: &Inventory,
    nb_devices: &dyn Collector,
    primary: &BTreeMap<Key, String>,
    options: &SyncOptions,
) -> Result<Vec<ItemOutcome>, ReconcileError> {
    let ctx = SyncContext::new(options);
    let limit = ctx.limit();
    let mut outcomes = Vec::new();

    // IP Fabric address records, matched on the raw IP Fabric hostname.
    let mut ipf_addrs = registry::collector(sources, SourceKind::IpFabric, CollectionKind::IpAddrs)?;
    let addr_params: Vec<FetchParams> = primary
        .iter()
        .filter_map(|(key, ip)| {
            let hostname = ipf_devices
                .source_record(key)
                .and_then(|rec| opt_text_at(rec, "hostname"))?;
            Some(FetchParams {
                filter: Some(format!("ip = '{ip}'")),
                hostname: Some(hostname),
                name: None,
            })
        })
        .collect();
    ipf_addrs.fetch_each(addr_params, limit).await?;
    ipf_addrs.make_keys(&KeyOptions::default())?;

    let mut ipf_ifaces =
        registry::collector(sources, SourceKind::IpFabric, CollectionKind::Interfaces)?;
    let iface_params: BTreeSet<FetchParams> = ipf_addrs
        .inventory()
        .keys()
        .keys()
        .filter_map(|key| ipf_addrs.inventory().source_record(key))
        .filter_map(|rec| {
            Some(FetchParams {
                filter: Some(format!("intName = '{}'", opt_text_at(rec, "intName")?)),
                hostname: opt_text_at(rec, "hostname"),
                name: None,
            })
        })
        .collect();
    ipf_ifaces
        .fetch_each(iface_params.into_iter().collect(), limit)
        .await?;
    ipf_ifaces.make_keys(&KeyOptions::default())?;

    let hosts: BTreeSet<FetchParams> = ipf_addrs.inventory().keys().values().map(by_hostname).collect();
    let mut nb_ifaces = registry::collector(sources, SourceKind::Netbox, CollectionKind::Interfaces)?;
    let mut nb_addrs = registry::collector(sources, SourceKind::Netbox, CollectionKind::IpAddrs)?;
    tokio::try_join!(
        nb_ifaces.fetch_each(hosts.iter().cloned().collect(), limit),
        nb_addrs.fetch_each(hosts.iter().cloned().collect(), limit),
    )?;
    nb_ifaces.make_keys(&KeyOptions::default())?;
    nb_addrs.make_keys(&KeyOptions::default())?;

    let iface_diff = diff(ipf_ifaces.inventory(), nb_ifaces.inventory(), None);
    if let Some(missing) = missing_of(CollectionKind::Interfaces, iface_diff) {
        let ctx = ctx.with_devices(nb_devices.inventory());
        let created = nb_ifaces.create_missing(&missing, &ctx).await?;
        nb_ifaces.absorb(&created)?;
        outcomes.extend(created);
    }

    let addr_diff = diff(ipf_addrs.inventory(), nb_addrs.inventory(), None);
    if let Some(missing) = missing_of(CollectionKind::IpAddrs, addr_diff) {
        let ctx = ctx.with_interfaces(nb_ifaces.inventory());
        let created = nb_addrs.create_missing(&missing, &ctx).await?;
        nb_addrs.absorb(&created)?;
        outcomes.extend(created);
    }

    let assignments: BTreeMap<Key, Change> = primary
        .iter()
        .filter_map(|(key, ip)| {
            let Some(fingerprint) = nb_devices.inventory().get(key) else {
                warn!("device ({key}) is not in Netbox; not assigning primary IP {ip}");
                return None;
            };
            let change = Change {
                fingerprint: fingerprint.clone(),
                fields: BTreeMap::from([("ipaddr".to_string(), FieldValue::from(ip.as_str()))]),
            };
            Some((key.clone(), change))
        })
        .collect();
    if !assignments.is_empty() {
        let ctx = ctx.with_ipaddrs(nb_addrs.inventory());
        outcomes.extend(nb_devices.update_changes(&assignments, &ctx).await?);
    }
    Ok(outcomes)
}

/// Missing records of a diff, logged; `None` when there are none.
fn missing_of(
    kind: CollectionKind,
    result: Option<DiffResult>,
) -> Option<BTreeMap<Key, Fingerprint>> {
    let result = result?;
    if result.missing.is_empty() {
        return None;
    }
    log_proposed_changes(kind, &result);
    Some(result.missing)
}
