use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::{dispatch, id_in, id_of, resolve_devices, Plan};
use crate::collector::{
    Action, CollectionKind, Collector, FetchParams, Inventory, ItemOutcome, SourceKind,
    SyncContext,
};
use crate::diff::Change;
use crate::error_handling::{FingerprintError, ReconcileError, RemoteError};
use crate::model::{opt_text_at, text_at, Fingerprint, Key, SourceRecord};
use crate::remote::{ApiRequest, NetboxClient};
use crate::sources::{netbox_query, Sources};

pub(crate) const INTERFACES: &str = "dcim/interfaces/";

/// Netbox interfaces, fetched per device.
pub struct NbInterfaces {
    client: Arc<NetboxClient>,
    inventory: Inventory,
}

impl NbInterfaces {
    pub fn new(sources: &Sources) -> Self {
        NbInterfaces {
            client: Arc::clone(&sources.netbox),
            inventory: Inventory::for_kind(CollectionKind::Interfaces),
        }
    }

    /// Device ids for every hostname in `missing`, from the resolved devices
    /// first and from Netbox for the rest.
    async fn device_ids(
        &self,
        missing: &BTreeMap<Key, Fingerprint>,
        ctx: &SyncContext<'_>,
    ) -> Result<BTreeMap<String, i64>, RemoteError> {
        let mut ids = BTreeMap::new();
        let mut unknown = BTreeSet::new();
        for fp in missing.values() {
            let hostname = fp.text("hostname");
            let known = ctx
                .devices
                .and_then(|devices| devices.source_record_by("hostname", hostname))
                .and_then(id_of);
            match known {
                Some(id) => {
                    ids.insert(hostname.to_string(), id);
                }
                None => {
                    unknown.insert(hostname.to_string());
                }
            }
        }
        if !unknown.is_empty() {
            ids.extend(resolve_devices(&self.client, unknown).await?);
        }
        Ok(ids)
    }
}

/// Netbox interface type for a (long form) interface name.
fn interface_type(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    if lower.starts_with("port-channel") {
        "lag"
    } else if ["loopback", "vlan", "tunnel"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
    {
        "virtual"
    } else {
        "other"
    }
}

#[async_trait]
impl Collector for NbInterfaces {
    fn kind(&self) -> CollectionKind {
        CollectionKind::Interfaces
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
            .paginate(INTERFACES, &netbox_query(params, "device"))
            .await
    }

    fn fingerprint(&self, record: &SourceRecord) -> Result<Fingerprint, FingerprintError> {
        Ok(Fingerprint::new()
            .with("hostname", text_at(record, "device.name")?)
            .with("interface", text_at(record, "name")?)
            .with(
                "description",
                opt_text_at(record, "description").unwrap_or_default(),
            ))
    }

    async fn create_missing(
        &self,
        missing: &BTreeMap<Key, Fingerprint>,
        ctx: &SyncContext<'_>,
    ) -> Result<Vec<ItemOutcome>, ReconcileError> {
        let device_ids = self.device_ids(missing, ctx).await?;
        let plans = missing
            .iter()
            .map(|(key, fp)| {
                let hostname = fp.text("hostname");
                let plan = match device_ids.get(hostname) {
                    Some(device) => {
                        let name = fp.text("interface");
                        Plan::Request(ApiRequest::post(
                            INTERFACES,
                            json!({
                                "device": device,
                                "name": name,
                                "type": interface_type(name),
                                "description": fp.text("description"),
                            }),
                        ))
                    }
                    None => Plan::skip(format!("no device '{hostname}'")),
                };
                (key.clone(), plan)
            })
            .collect();
        dispatch(&self.client, "interface", Action::Create, plans, ctx.limit()).await
    }

    async fn update_changes(
        &self,
        changes: &BTreeMap<Key, Change>,
        ctx: &SyncContext<'_>,
    ) -> Result<Vec<ItemOutcome>, ReconcileError> {
        let plans = changes
            .iter()
            .map(|(key, change)| {
                let plan = match (id_in(Some(&self.inventory), key), change.fields.get("description")) {
                    (Some(id), Some(description)) => Plan::Request(ApiRequest::patch(
                        format!("{INTERFACES}{id}/"),
                        json!({ "description": description.as_text().unwrap_or("") }),
                    )),
                    (None, _) => Plan::skip("interface has no Netbox id"),
                    (Some(_), None) => Plan::skip("no applicable field changes"),
                };
                (key.clone(), plan)
            })
            .collect();
        dispatch(&self.client, "interface", Action::Update, plans, ctx.limit()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Normalizer;
    use crate::sources::offline_sources;

    #[test]
    fn test_interface_type() {
        assert_eq!(interface_type("Port-Channel10"), "lag");
        assert_eq!(interface_type("Loopback0"), "virtual");
        assert_eq!(interface_type("Vlan100"), "virtual");
        assert_eq!(interface_type("Ethernet1"), "other");
    }

    #[test]
    fn test_fingerprint_null_description() {
        let col = NbInterfaces::new(&offline_sources(Normalizer::default()));
        let rec = json!({"id": 1, "device": {"name": "sw1"}, "name": "Ethernet1", "description": null});
        let fp = col.fingerprint(&rec).unwrap();
        assert_eq!(fp.text("hostname"), "sw1");
        assert_eq!(fp.text("description"), "");
    }
}
