use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
use serde_json::{json, Map, Value};

use super::{dispatch, id_in, id_of, resolve_slugs, Plan};
use crate::collector::{
    Action, CollectionKind, Collector, FetchParams, Inventory, ItemOutcome, SourceKind,
    SyncContext,
};
use crate::config::{Normalizer, NETBOX_DEVICE_STATUS};
use crate::diff::Change;
use crate::error_handling::{FingerprintError, ReconcileError, RemoteError};
use crate::model::{opt_text_at, text_at, FieldValue, Fingerprint, Key, SourceRecord};
use crate::remote::{ApiRequest, NetboxClient};
use crate::sources::{netbox_query, Sources};

const DEVICES: &str = "dcim/devices/";

/// Netbox devices that have a platform, keyed by serial number.
pub struct NbDevices {
    client: Arc<NetboxClient>,
    normalizer: Arc<Normalizer>,
    inventory: Inventory,
}

impl NbDevices {
    pub fn new(sources: &Sources) -> Self {
        NbDevices {
            client: Arc::clone(&sources.netbox),
            normalizer: Arc::clone(&sources.normalizer),
            inventory: Inventory::for_kind(CollectionKind::Devices),
        }
    }

    async fn resolve(
        &self,
        device_types: BTreeSet<String>,
        sites: BTreeSet<String>,
        platforms: BTreeSet<String>,
    ) -> Result<Prerequisites, RemoteError> {
        let roles: BTreeSet<String> = self
            .normalizer
            .device_role()
            .map(str::to_string)
            .into_iter()
            .collect();
        let (device_types, sites, platforms, roles) = tokio::try_join!(
            resolve_slugs(&self.client, "dcim/device-types/", device_types),
            resolve_slugs(&self.client, "dcim/sites/", sites),
            resolve_slugs(&self.client, "dcim/platforms/", platforms),
            resolve_slugs(&self.client, "dcim/device-roles/", roles),
        )?;
        Ok(Prerequisites {
            device_types,
            sites,
            platforms,
            roles,
        })
    }

    fn plan_update(
        &self,
        key: &Key,
        change: &Change,
        ids: &Prerequisites,
        ctx: &SyncContext<'_>,
    ) -> Plan {
        let Some(device_id) = id_in(Some(&self.inventory), key) else {
            return Plan::skip("device has no Netbox id");
        };
        let hostname = change
            .fields
            .get("hostname")
            .and_then(FieldValue::as_text)
            .unwrap_or(change.fingerprint.text("hostname"));

        let mut body = Map::new();
        let mut unresolved = Vec::new();
        for (field, value) in &change.fields {
            let text = value.as_text().unwrap_or("");
            let (attr, id) = match field.as_str() {
                "hostname" => {
                    body.insert("name".into(), json!(text));
                    continue;
                }
                "site" => ("site", ids.sites.get(text).copied()),
                "os_name" => ("platform", ids.platforms.get(text).copied()),
                "model" => ("device_type", ids.device_types.get(text).copied()),
                "ipaddr" => ("primary_ip4", primary_ip_id(ctx.ipaddrs, hostname, text)),
                // vendor follows the device type
                _ => continue,
            };
            match id {
                Some(id) => {
                    body.insert(attr.into(), json!(id));
                }
                None => unresolved.push(format!("{field} '{text}'")),
            }
        }

        if body.is_empty() {
            if unresolved.is_empty() {
                return Plan::skip("no applicable field changes");
            }
            return Plan::skip(format!("unresolved {}", unresolved.join(", ")));
        }
        if !unresolved.is_empty() {
            warn!(
                "device {hostname}: not changing unresolved {}",
                unresolved.join(", ")
            );
        }
        Plan::Request(ApiRequest::patch(
            format!("{DEVICES}{device_id}/"),
            Value::Object(body),
        ))
    }
}

/// Ids of the objects a device record refers to, by slug.
#[derive(Debug, Default)]
struct Prerequisites {
    device_types: BTreeMap<String, i64>,
    sites: BTreeMap<String, i64>,
    platforms: BTreeMap<String, i64>,
    roles: BTreeMap<String, i64>,
}

impl Prerequisites {
    fn plan_create(&self, fingerprint: &Fingerprint, role: Option<&str>) -> Plan {
        let model = fingerprint.text("model");
        let site = fingerprint.text("site");
        let platform = fingerprint.text("os_name");

        let Some(device_type) = self.device_types.get(model) else {
            return Plan::skip(format!("no device-type '{model}'"));
        };
        let Some(site_id) = self.sites.get(site) else {
            return Plan::skip(format!("no site '{site}'"));
        };
        let Some(platform_id) = self.platforms.get(platform) else {
            return Plan::skip(format!("no platform '{platform}'"));
        };

        let mut body = json!({
            "name": fingerprint.text("hostname"),
            "serial": fingerprint.text("sn"),
            "device_type": device_type,
            "site": site_id,
            "platform": platform_id,
            "status": NETBOX_DEVICE_STATUS,
        });
        if let Some(role) = role {
            let Some(role_id) = self.roles.get(role) else {
                return Plan::skip(format!("no device-role '{role}'"));
            };
            body["role"] = json!(role_id);
            body["device_role"] = json!(role_id);
        }
        Plan::Request(ApiRequest::post(DEVICES, body))
    }
}

/// Id of the address on `hostname` whose address part is `ip`.
fn primary_ip_id(ipaddrs: Option<&Inventory>, hostname: &str, ip: &str) -> Option<i64> {
    let inventory = ipaddrs?;
    let prefix = format!("{ip}/");
    inventory
        .keys()
        .keys()
        .find(|key| key.text(0) == hostname && key.text(1).starts_with(&prefix))
        .and_then(|key| inventory.source_record(key))
        .and_then(id_of)
}

fn texts<'a>(fingerprints: impl Iterator<Item = &'a Fingerprint>, field: &str) -> BTreeSet<String> {
    fingerprints
        .map(|fp| fp.text(field))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn changed_texts(changes: &BTreeMap<Key, Change>, field: &str) -> BTreeSet<String> {
    changes
        .values()
        .filter_map(|change| change.fields.get(field).and_then(FieldValue::as_text))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Collector for NbDevices {
    fn kind(&self) -> CollectionKind {
        CollectionKind::Devices
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
        let mut query = vec![
            ("exclude".to_string(), "config_context".to_string()),
            ("platform__n".to_string(), "null".to_string()),
        ];
        query.extend(netbox_query(params, "name"));
        self.client.paginate(DEVICES, &query).await
    }

    fn fingerprint(&self, record: &SourceRecord) -> Result<Fingerprint, FingerprintError> {
        let ipaddr = opt_text_at(record, "primary_ip.address")
            .map(|addr| addr.split('/').next().unwrap_or("").to_string())
            .unwrap_or_default();
        let mut fingerprint = Fingerprint::new()
            .with("sn", text_at(record, "serial")?)
            .with("hostname", text_at(record, "name")?)
            .with("ipaddr", ipaddr)
            .with("site", text_at(record, "site.slug")?)
            .with("os_name", text_at(record, "platform.slug")?)
            .with("vendor", text_at(record, "device_type.manufacturer.slug")?)
            .with("model", text_at(record, "device_type.slug")?);
        if let Some(status) = opt_text_at(record, "status.value") {
            fingerprint.insert("status", status);
        }
        Ok(fingerprint)
    }

    async fn create_missing(
        &self,
        missing: &BTreeMap<Key, Fingerprint>,
        ctx: &SyncContext<'_>,
    ) -> Result<Vec<ItemOutcome>, ReconcileError> {
        let ids = self
            .resolve(
                texts(missing.values(), "model"),
                texts(missing.values(), "site"),
                texts(missing.values(), "os_name"),
            )
            .await?;
        let role = self.normalizer.device_role();
        let plans = missing
            .iter()
            .map(|(key, fp)| (key.clone(), ids.plan_create(fp, role)))
            .collect();
        dispatch(&self.client, "device", Action::Create, plans, ctx.limit()).await
    }

    async fn update_changes(
        &self,
        changes: &BTreeMap<Key, Change>,
        ctx: &SyncContext<'_>,
    ) -> Result<Vec<ItemOutcome>, ReconcileError> {
        let ids = self
            .resolve(
                changed_texts(changes, "model"),
                changed_texts(changes, "site"),
                changed_texts(changes, "os_name"),
            )
            .await?;
        let plans = changes
            .iter()
            .map(|(key, change)| (key.clone(), self.plan_update(key, change, &ids, ctx)))
            .collect();
        dispatch(&self.client, "device", Action::Update, plans, ctx.limit()).await
    }
}
