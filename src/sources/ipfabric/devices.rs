use std::sync::Arc;

use async_trait::async_trait;

use crate::collector::{CollectionKind, Collector, FetchParams, Inventory, SourceKind};
use crate::config::{slugify, Normalizer};
use crate::error_handling::{FingerprintError, RemoteError};
use crate::model::{text_at, Fingerprint, SourceRecord};
use crate::remote::IpFabricClient;
use crate::sources::{ipfabric_filter, Sources};

/// Device inventory, keyed by serial number.
pub struct IpfDevices {
    client: Arc<IpFabricClient>,
    normalizer: Arc<Normalizer>,
    inventory: Inventory,
}

impl IpfDevices {
    pub fn new(sources: &Sources) -> Self {
        IpfDevices {
            client: Arc::clone(&sources.ipfabric),
            normalizer: Arc::clone(&sources.normalizer),
            inventory: Inventory::for_kind(CollectionKind::Devices),
        }
    }
}

#[async_trait]
impl Collector for IpfDevices {
    fn kind(&self) -> CollectionKind {
        CollectionKind::Devices
    }

    fn source(&self) -> SourceKind {
        SourceKind::IpFabric
    }

    fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.inventory
    }

    async fn fetch_records(&self, params: &FetchParams) -> Result<Vec<SourceRecord>, RemoteError> {
        self.client.fetch_devices(ipfabric_filter(params)?).await
    }

    fn fingerprint(&self, record: &SourceRecord) -> Result<Fingerprint, FingerprintError> {
        Ok(Fingerprint::new()
            .with("sn", text_at(record, "sn")?)
            .with(
                "hostname",
                self.normalizer
                    .normalize_hostname(&text_at(record, "hostname")?),
            )
            .with("ipaddr", text_at(record, "loginIp")?)
            .with("site", slugify(&text_at(record, "siteName")?))
            .with("os_name", slugify(&text_at(record, "family")?))
            .with("vendor", slugify(&text_at(record, "vendor")?))
            .with(
                "model",
                self.normalizer.device_type_slug(&text_at(record, "model")?),
            ))
    }
}
