use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{json, Value};

use super::interfaces::INTERFACES;
use super::{dispatch, id_in, id_of, Plan};
use crate::collector::{
    Action, CollectionKind, Collector, FetchParams, Inventory, ItemOutcome, SourceKind,
    SyncContext,
};
use crate::diff::Change;
use crate::error_handling::{FingerprintError, ReconcileError, RemoteError};
use crate::model::{text_at, FieldValue, Fingerprint, Key, SourceRecord};
use crate::remote::{ApiRequest, NetboxClient};
use crate::sources::{netbox_query, Sources};

/// LAG memberships: one record per member interface, carrying its `lag`.
///
/// Membership is changed by patching the member interface's `lag` attribute.
/// Member and LAG interface ids are looked up in the interfaces inventory of
/// the [`SyncContext`], keyed by `(hostname, interface)`.
pub struct NbPortChannels {
    client: Arc<NetboxClient>,
    inventory: Inventory,
}

impl NbPortChannels {
    pub fn new(sources: &Sources) -> Self {
        NbPortChannels {
            client: Arc::clone(&sources.netbox),
            inventory: Inventory::for_kind(CollectionKind::PortChannels),
        }
    }

    fn set_lag(&self, member: i64, lag: Option<i64>) -> Plan {
        Plan::Request(ApiRequest::patch(
            format!("{INTERFACES}{member}/"),
            json!({ "lag": lag }),
        ))
    }
}

#[async_trait]
impl Collector for NbPortChannels {
    fn kind(&self) -> CollectionKind {
        CollectionKind::PortChannels
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

    /// Fetches the LAG interfaces, then the members of each.
    async fn fetch_records(&self, params: &FetchParams) -> Result<Vec<SourceRecord>, RemoteError> {
        let mut query = netbox_query(params, "device");
        query.push(("type".to_string(), "lag".to_string()));
        let lags = self.client.paginate(INTERFACES, &query).await?;

        let members = lags.iter().filter_map(id_of).map(|lag_id| {
            let query = [("lag_id".to_string(), lag_id.to_string())];
            async move { self.client.paginate(INTERFACES, &query).await }
        });
        let members: Vec<Vec<Value>> = try_join_all(members).await?;
        Ok(members.into_iter().flatten().collect())
    }

    fn fingerprint(&self, record: &SourceRecord) -> Result<Fingerprint, FingerprintError> {
        Ok(Fingerprint::new()
            .with("hostname", text_at(record, "device.name")?)
            .with("interface", text_at(record, "name")?)
            .with("portchan", text_at(record, "lag.name")?))
    }

    async fn create_missing(
        &self,
        missing: &BTreeMap<Key, Fingerprint>,
        ctx: &SyncContext<'_>,
    ) -> Result<Vec<ItemOutcome>, ReconcileError> {
        let plans = missing
            .iter()
            .map(|(key, fp)| {
                let hostname = fp.text("hostname");
                let member = id_in(ctx.interfaces, &Key::from([hostname, fp.text("interface")]));
                let lag = id_in(ctx.interfaces, &Key::from([hostname, fp.text("portchan")]));
                let plan = match (member, lag) {
                    (Some(member), Some(lag)) => self.set_lag(member, Some(lag)),
                    (None, _) => Plan::skip("member interface not found"),
                    (_, None) => Plan::skip(format!("no LAG {}", fp.text("portchan"))),
                };
                (key.clone(), plan)
            })
            .collect();
        dispatch(&self.client, "lag member", Action::Create, plans, ctx.limit()).await
    }

    async fn update_changes(
        &self,
        changes: &BTreeMap<Key, Change>,
        ctx: &SyncContext<'_>,
    ) -> Result<Vec<ItemOutcome>, ReconcileError> {
        let plans = changes
            .iter()
            .map(|(key, change)| {
                let portchan = change
                    .fields
                    .get("portchan")
                    .and_then(FieldValue::as_text)
                    .unwrap_or("");
                let member = id_in(Some(&self.inventory), key);
                let lag = id_in(ctx.interfaces, &Key::from([key.text(0), portchan]));
                let plan = match (member, lag) {
                    (Some(member), Some(lag)) => self.set_lag(member, Some(lag)),
                    (None, _) => Plan::skip("member interface has no Netbox id"),
                    (_, None) => Plan::skip(format!("no LAG {portchan}")),
                };
                (key.clone(), plan)
            })
            .collect();
        dispatch(&self.client, "lag member", Action::Update, plans, ctx.limit()).await
    }

    /// Unlinks members that IP Fabric does not report in any LAG.
    async fn remove_extra(
        &self,
        extra: &BTreeMap<Key, Fingerprint>,
        ctx: &SyncContext<'_>,
    ) -> Result<Vec<ItemOutcome>, ReconcileError> {
        let plans = extra
            .keys()
            .map(|key| {
                let plan = match id_in(Some(&self.inventory), key) {
                    Some(member) => self.set_lag(member, None),
                    None => Plan::skip("member interface has no Netbox id"),
                };
                (key.clone(), plan)
            })
            .collect();
        dispatch(&self.client, "lag member", Action::Remove, plans, ctx.limit()).await
    }
}
