use std::sync::Arc;

use async_trait::async_trait;

use crate::collector::{CollectionKind, Collector, FetchParams, Inventory, SourceKind};
use crate::config::slugify;
use crate::error_handling::{FingerprintError, RemoteError};
use crate::model::{text_at, Fingerprint, SourceRecord};
use crate::remote::IpFabricClient;
use crate::sources::{ipfabric_filter, Sources};

/// Sites from `tables/inventory/sites`.
///
/// The site name is slugified to match Netbox site slugs; the original name is
/// kept as `display_name` for creating the Netbox site.
pub struct IpfSites {
    client: Arc<IpFabricClient>,
    inventory: Inventory,
}

impl IpfSites {
    pub fn new(sources: &Sources) -> Self {
        IpfSites {
            client: Arc::clone(&sources.ipfabric),
            inventory: Inventory::for_kind(CollectionKind::Sites),
        }
    }
}

#[async_trait]
impl Collector for IpfSites {
    fn kind(&self) -> CollectionKind {
        CollectionKind::Sites
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
                "tables/inventory/sites",
                &["siteName"],
                ipfabric_filter(params)?,
            )
            .await
    }

    fn fingerprint(&self, record: &SourceRecord) -> Result<Fingerprint, FingerprintError> {
        let name = text_at(record, "siteName")?;
        Ok(Fingerprint::new()
            .with("name", slugify(&name))
            .with("display_name", name))
    }
}
