use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::{dispatch, id_in, Plan};
use crate::collector::{
    Action, CollectionKind, Collector, FetchParams, Inventory, ItemOutcome, SourceKind,
    SyncContext,
};
use crate::diff::Change;
use crate::error_handling::{FingerprintError, ReconcileError, RemoteError};
use crate::model::{text_at, FieldValue, Fingerprint, Key, SourceRecord};
use crate::remote::{ApiRequest, NetboxClient};
use crate::sources::{netbox_query, Sources};

const IP_ADDRESSES: &str = "ipam/ip-addresses/";
const ASSIGNED_TYPE: &str = "dcim.interface";

/// Netbox IP addresses assigned to device interfaces.
///
/// New addresses are bound to interfaces found in the interfaces inventory of
/// the [`SyncContext`]; an address whose interface is not there is skipped.
pub struct NbIpAddrs {
    client: Arc<NetboxClient>,
    inventory: Inventory,
}

impl NbIpAddrs {
    pub fn new(sources: &Sources) -> Self {
        NbIpAddrs {
            client: Arc::clone(&sources.netbox),
            inventory: Inventory::for_kind(CollectionKind::IpAddrs),
        }
    }
}

#[async_trait]
impl Collector for NbIpAddrs {
    fn kind(&self) -> CollectionKind {
        CollectionKind::IpAddrs
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
            .paginate(IP_ADDRESSES, &netbox_query(params, "device"))
            .await
    }

    fn fingerprint(&self, record: &SourceRecord) -> Result<Fingerprint, FingerprintError> {
        Ok(Fingerprint::new()
            .with("ipaddr", text_at(record, "address")?)
            .with("hostname", text_at(record, "assigned_object.device.name")?)
            .with("interface", text_at(record, "assigned_object.name")?))
    }

    async fn create_missing(
        &self,
        missing: &BTreeMap<Key, Fingerprint>,
        ctx: &SyncContext<'_>,
    ) -> Result<Vec<ItemOutcome>, ReconcileError> {
        let plans = missing
            .iter()
            .map(|(key, fp)| {
                let iface_key = Key::from([fp.text("hostname"), fp.text("interface")]);
                let plan = match id_in(ctx.interfaces, &iface_key) {
                    Some(iface) => Plan::Request(ApiRequest::post(
                        IP_ADDRESSES,
                        json!({
                            "address": fp.text("ipaddr"),
                            "assigned_object_type": ASSIGNED_TYPE,
                            "assigned_object_id": iface,
                            "status": "active",
                        }),
                    )),
                    None => Plan::skip(format!("no interface ({iface_key})")),
                };
                (key.clone(), plan)
            })
            .collect();
        dispatch(&self.client, "ipaddr", Action::Create, plans, ctx.limit()).await
    }

    async fn update_changes(
        &self,
        changes: &BTreeMap<Key, Change>,
        ctx: &SyncContext<'_>,
    ) -> Result<Vec<ItemOutcome>, ReconcileError> {
        let plans = changes
            .iter()
            .map(|(key, change)| {
                let Some(addr_id) = id_in(Some(&self.inventory), key) else {
                    return (key.clone(), Plan::skip("address has no Netbox id"));
                };
                let Some(iface) = change.fields.get("interface").and_then(FieldValue::as_text) else {
                    return (key.clone(), Plan::skip("no applicable field changes"));
                };
                let iface_key = Key::from([key.text(0), iface]);
                let plan = match id_in(ctx.interfaces, &iface_key) {
                    Some(iface_id) => Plan::Request(ApiRequest::patch(
                        format!("{IP_ADDRESSES}{addr_id}/"),
                        json!({
                            "assigned_object_type": ASSIGNED_TYPE,
                            "assigned_object_id": iface_id,
                        }),
                    )),
                    None => Plan::skip(format!("no interface ({iface_key})")),
                };
                (key.clone(), plan)
            })
            .collect();
        dispatch(&self.client, "ipaddr", Action::Update, plans, ctx.limit()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Normalizer;
    use crate::sources::offline_sources;

    #[test]
    fn test_fingerprint_assigned_object() {
        let col = NbIpAddrs::new(&offline_sources(Normalizer::default()));
        let rec = json!({
            "id": 4,
            "address": "10.0.0.1/24",
            "assigned_object": {"name": "Management1", "device": {"name": "sw1"}}
        });
        let fp = col.fingerprint(&rec).unwrap();
        let key = fp.key_for(col.inventory().key_fields()).unwrap();
        assert_eq!(key, Key::from(["sw1", "10.0.0.1/24"]));
        assert_eq!(fp.text("interface"), "Management1");
    }

    #[test]
    fn test_fingerprint_unassigned_fails() {
        let col = NbIpAddrs::new(&offline_sources(Normalizer::default()));
        let rec = json!({"id": 4, "address": "10.0.0.1/24", "assigned_object": null});
        assert!(matches!(
            col.fingerprint(&rec),
            Err(FingerprintError::MissingField { .. })
        ));
    }
}
