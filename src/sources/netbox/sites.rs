use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::{dispatch, Plan};
use crate::collector::{
    Action, CollectionKind, Collector, FetchParams, Inventory, ItemOutcome, SourceKind,
    SyncContext,
};
use crate::error_handling::{FingerprintError, ReconcileError, RemoteError};
use crate::model::{text_at, Fingerprint, Key, SourceRecord};
use crate::remote::{ApiRequest, NetboxClient};
use crate::sources::{netbox_query, Sources};

/// Netbox sites, fingerprinted by slug.
pub struct NbSites {
    client: Arc<NetboxClient>,
    inventory: Inventory,
}

impl NbSites {
    pub fn new(sources: &Sources) -> Self {
        NbSites {
            client: Arc::clone(&sources.netbox),
            inventory: Inventory::for_kind(CollectionKind::Sites),
        }
    }
}

/// Body for creating the site described by an IP Fabric fingerprint.
fn site_body(fingerprint: &Fingerprint) -> serde_json::Value {
    let slug = fingerprint.text("name");
    let name = match fingerprint.text("display_name") {
        "" => slug,
        name => name,
    };
    json!({ "name": name, "slug": slug })
}

#[async_trait]
impl Collector for NbSites {
    fn kind(&self) -> CollectionKind {
        CollectionKind::Sites
    }

    fn source(&self) -> SourceKind {
        SourceKind::Netbox
    }

    fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.inventory
    }

    async fn fetch_records(&self, params: &FetchParams) -> Result<Vec<SourceRecord>, RemoteError> {
        self.client
            .paginate("dcim/sites/", &netbox_query(params, "name"))
            .await
    }

    fn fingerprint(&self, record: &SourceRecord) -> Result<Fingerprint, FingerprintError> {
        Ok(Fingerprint::new().with("name", text_at(record, "slug")?))
    }

    async fn create_missing(
        &self,
        missing: &BTreeMap<Key, Fingerprint>,
        ctx: &SyncContext<'_>,
    ) -> Result<Vec<ItemOutcome>, ReconcileError> {
        let plans = missing
            .iter()
            .map(|(key, fp)| {
                let request = ApiRequest::post("dcim/sites/", site_body(fp));
                (key.clone(), Plan::Request(request))
            })
            .collect();
        dispatch(&self.client, "site", Action::Create, plans, ctx.limit()).await
    }
}
