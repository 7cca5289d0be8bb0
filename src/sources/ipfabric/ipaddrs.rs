use std::sync::Arc;

use async_trait::async_trait;

use crate::collector::{CollectionKind, Collector, FetchParams, Inventory, SourceKind};
use crate::config::Normalizer;
use crate::error_handling::{FingerprintError, RemoteError};
use crate::model::{text_at, Fingerprint, SourceRecord};
use crate::remote::IpFabricClient;
use crate::sources::{ipfabric_filter, Sources};

/// Managed device addresses. `ipaddr` is `<ip>/<prefix length of net>`.
pub struct IpfIpAddrs {
    client: Arc<IpFabricClient>,
    normalizer: Arc<Normalizer>,
    inventory: Inventory,
}

impl IpfIpAddrs {
    pub fn new(sources: &Sources) -> Self {
        IpfIpAddrs {
            client: Arc::clone(&sources.ipfabric),
            normalizer: Arc::clone(&sources.normalizer),
            inventory: Inventory::for_kind(CollectionKind::IpAddrs),
        }
    }
}

#[async_trait]
impl Collector for IpfIpAddrs {
    fn kind(&self) -> CollectionKind {
        CollectionKind::IpAddrs
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
                "tables/addressing/managed-devs",
                &["hostname", "intName", "siteName", "ip", "net"],
                ipfabric_filter(params)?,
            )
            .await
    }

    fn fingerprint(&self, record: &SourceRecord) -> Result<Fingerprint, FingerprintError> {
        let ip = text_at(record, "ip")?;
        let net = text_at(record, "net")?;
        let prefix_len = match net.rsplit_once('/') {
            Some((_, len)) if !len.is_empty() => len,
            _ => {
                return Err(FingerprintError::malformed(
                    format!("network '{net}' has no prefix length"),
                    record,
                ))
            }
        };
        Ok(Fingerprint::new()
            .with("ipaddr", format!("{ip}/{prefix_len}"))
            .with(
                "interface",
                self.normalizer.expand_interface(&text_at(record, "intName")?),
            )
            .with(
                "hostname",
                self.normalizer
                    .normalize_hostname(&text_at(record, "hostname")?),
            ))
    }
}
