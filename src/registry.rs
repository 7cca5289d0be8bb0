//! Lookup table from `(source, collection)` to collector constructor.

use crate::collector::{CollectionKind, Collector, SourceKind};
use crate::error_handling::ReconcileError;
use crate::sources::{ipfabric, netbox, Sources};

type Factory = fn(&Sources) -> Box<dyn Collector>;

static REGISTRY: &[(SourceKind, CollectionKind, Factory)] = &[
    (
        SourceKind::IpFabric,
        CollectionKind::Sites,
        |s| Box::new(ipfabric::IpfSites::new(s)),
    ),
    (
        SourceKind::IpFabric,
        CollectionKind::Devices,
        |s| Box::new(ipfabric::IpfDevices::new(s)),
    ),
    (
        SourceKind::IpFabric,
        CollectionKind::Interfaces,
        |s| Box::new(ipfabric::IpfInterfaces::new(s)),
    ),
    (
        SourceKind::IpFabric,
        CollectionKind::IpAddrs,
        |s| Box::new(ipfabric::IpfIpAddrs::new(s)),
    ),
    (
        SourceKind::IpFabric,
        CollectionKind::PortChannels,
        |s| Box::new(ipfabric::IpfPortChannels::new(s)),
    ),
    (
        SourceKind::Netbox,
        CollectionKind::Sites,
        |s| Box::new(netbox::NbSites::new(s)),
    ),
    (
        SourceKind::Netbox,
        CollectionKind::Devices,
        |s| Box::new(netbox::NbDevices::new(s)),
    ),
    (
        SourceKind::Netbox,
        CollectionKind::Interfaces,
        |s| Box::new(netbox::NbInterfaces::new(s)),
    ),
    (
        SourceKind::Netbox,
        CollectionKind::IpAddrs,
        |s| Box::new(netbox::NbIpAddrs::new(s)),
    ),
    (
        SourceKind::Netbox,
        CollectionKind::PortChannels,
        |s| Box::new(netbox::NbPortChannels::new(s)),
    ),
];

/// Builds a fresh, empty collector.
pub fn collector(
    sources: &Sources,
    source: SourceKind,
    kind: CollectionKind,
) -> Result<Box<dyn Collector>, ReconcileError> {
    REGISTRY
        .iter()
        .find(|(s, k, _)| *s == source && *k == kind)
        .map(|(_, _, factory)| factory(sources))
        .ok_or_else(|| ReconcileError::CollectorNotFound {
            source_kind: source.to_string(),
            collection: kind.to_string(),
        })
}

/// Like [`collector`], by name (`"ipfabric"`, `"interfaces"`).
pub fn collector_by_name(
    sources: &Sources,
    source: &str,
    collection: &str,
) -> Result<Box<dyn Collector>, ReconcileError> {
    match (SourceKind::from_name(source), CollectionKind::from_name(collection)) {
        (Some(source), Some(kind)) => collector(sources, source, kind),
        _ => Err(ReconcileError::CollectorNotFound {
            source_kind: source.to_string(),
            collection: collection.to_string(),
        }),
    }
}
