use std::sync::Arc;

use async_trait::async_trait;

use crate::collector::{CollectionKind, Collector, FetchParams, Inventory, SourceKind};
use crate::config::Normalizer;
use crate::error_handling::{FingerprintError, RemoteError};
use crate::model::{opt_text_at, text_at, Fingerprint, SourceRecord};
use crate::remote::IpFabricClient;
use crate::sources::{ipfabric_filter, Sources};

pub struct IpfInterfaces {
    client: Arc<IpFabricClient>,
    normalizer: Arc<Normalizer>,
    inventory: Inventory,
}

impl IpfInterfaces {
    pub fn new(sources: &Sources) -> Self {
        IpfInterfaces {
            client: Arc::clone(&sources.ipfabric),
            normalizer: Arc::clone(&sources.normalizer),
            inventory: Inventory::for_kind(CollectionKind::Interfaces),
        }
    }
}

#[async_trait]
impl Collector for IpfInterfaces {
    fn kind(&self) -> CollectionKind {
        CollectionKind::Interfaces
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
        self.client
            .fetch_table(
                "tables/inventory/interfaces",
                &["hostname", "intName", "dscr", "siteName"],
                ipfabric_filter(params)?,
            )
            .await
    }

    fn fingerprint(&self, record: &SourceRecord) -> Result<Fingerprint, FingerprintError> {
        Ok(Fingerprint::new()
            .with(
                "hostname",
                self.normalizer
                    .normalize_hostname(&text_at(record, "hostname")?),
            )
            .with(
                "interface",
                self.normalizer.expand_interface(&text_at(record, "intName")?),
            )
            .with("description", opt_text_at(record, "dscr").unwrap_or_default()))
    }
}
