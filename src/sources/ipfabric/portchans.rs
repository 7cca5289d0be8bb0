use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::collector::{CollectionKind, Collector, FetchParams, Inventory, SourceKind};
use crate::config::Normalizer;
use crate::error_handling::{FingerprintError, RemoteError};
use crate::model::{text_at, Fingerprint, SourceRecord};
use crate::remote::IpFabricClient;
use crate::sources::{ipfabric_filter, Sources};

const MEMBER_STATUS_TABLE: &str = "tables/interfaces/port-channel/member-status";

/// Port-channel memberships, one record per member interface.
///
/// The member-status table lists each port-channel with its members; fetched
/// rows are flattened to `{hostname, intName, portchan}`.
pub struct IpfPortChannels {
    client: Arc<IpFabricClient>,
    normalizer: Arc<Normalizer>,
    inventory: Inventory,
}

impl IpfPortChannels {
    pub fn new(sources: &Sources) -> Self {
        IpfPortChannels {
            client: Arc::clone(&sources.ipfabric),
            normalizer: Arc::clone(&sources.normalizer),
            inventory: Inventory::for_kind(CollectionKind::PortChannels),
        }
    }
}

fn flatten_members(rows: Vec<Value>) -> Vec<Value> {
    rows.iter()
        .flat_map(|row| {
            let members = row
                .get("members")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            members.into_iter().map(move |member| {
                json!({
                    "hostname": row.get("hostname").cloned().unwrap_or(Value::Null),
                    "intName": member.get("intName").cloned().unwrap_or(Value::Null),
                    "portchan": row.get("intName").cloned().unwrap_or(Value::Null),
                })
            })
        })
        .collect()
}

#[async_trait]
impl Collector for IpfPortChannels {
    fn kind(&self) -> CollectionKind {
        CollectionKind::PortChannels
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
        let rows = self
            .client
            .fetch_table(
                MEMBER_STATUS_TABLE,
                &["hostname", "intName", "members"],
                ipfabric_filter(params)?,
            )
            .await?;
        Ok(flatten_members(rows))
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
            .with(
                "portchan",
                self.normalizer.expand_interface(&text_at(record, "portchan")?),
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_members() {
        let rows = vec![
            json!({"hostname": "sw1", "intName": "Po1", "members": [
                {"intName": "Et1", "status": "up"},
                {"intName": "Et2", "status": "up"}
            ]}),
            json!({"hostname": "sw2", "intName": "Po2", "members": []}),
        ];
        let flat = flatten_members(rows);
        assert_eq!(
            flat,
            vec![
                json!({"hostname": "sw1", "intName": "Et1", "portchan": "Po1"}),
                json!({"hostname": "sw1", "intName": "Et2", "portchan": "Po1"}),
            ]
        );
    }
}
