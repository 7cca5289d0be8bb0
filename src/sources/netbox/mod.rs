//! Netbox collectors: the sync target.
//!
//! Corrective operations plan one [`ApiRequest`] per diff item (or a skip
//! reason when a prerequisite is missing) and run the plans through the
//! [`BoundedExecutor`].

mod devices;
mod interfaces;
mod ipaddrs;
mod portchans;
mod sites;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use futures::future::try_join_all;
use log::debug;
use serde_json::Value;

use crate::collector::{Action, Inventory, ItemOutcome};
use crate::error_handling::{ReconcileError, RemoteError};
use crate::executor::BoundedExecutor;
use crate::model::{Key, SourceRecord};
use crate::remote::{ApiRequest, NetboxClient};

pub use devices::NbDevices;
pub use interfaces::NbInterfaces;
pub use ipaddrs::NbIpAddrs;
pub use portchans::NbPortChannels;
pub use sites::NbSites;

/// What to do for one diff item.
#[derive(Debug, Clone)]
pub(crate) enum Plan {
    Request(ApiRequest),
    Skip(String),
}

impl Plan {
    fn skip(reason: impl Into<String>) -> Self {
        Plan::Skip(reason.into())
    }
}

/// Runs planned requests with at most `limit` in flight.
///
/// Returns exactly one outcome per plan. Skipped plans are reported without
/// being submitted.
pub(crate) async fn dispatch(
    client: &Arc<NetboxClient>,
    what: &'static str,
    action: Action,
    plans: Vec<(Key, Plan)>,
    limit: usize,
) -> Result<Vec<ItemOutcome>, ReconcileError> {
    let mut outcomes: Vec<ItemOutcome> = plans
        .iter()
        .filter_map(|(key, plan)| match plan {
            Plan::Skip(reason) => Some(ItemOutcome::skipped(key.clone(), action, reason.as_str())),
            Plan::Request(_) => None,
        })
        .collect();
    for outcome in &outcomes {
        outcome.log(what);
    }

    let client = Arc::clone(client);
    let executor = BoundedExecutor::spawn(plans, limit, move |(_, plan): &(Key, Plan)| {
        match plan {
            Plan::Request(request) => {
                let client = Arc::clone(&client);
                let request = request.clone();
                Some(async move { client.execute(request).await })
            }
            Plan::Skip(_) => None,
        }
    });

    executor
        .try_for_each(|(key, _), result| {
            let outcome = ItemOutcome::from_result(key, action, result);
            outcome.log(what);
            outcomes.push(outcome);
            Ok::<_, ReconcileError>(())
        })
        .await?;

    Ok(outcomes)
}

/// Remote id of a Netbox record.
pub(crate) fn id_of(record: &SourceRecord) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}

/// Remote id of the record indexed under `key`, if `inventory` is available.
pub(crate) fn id_in(inventory: Option<&Inventory>, key: &Key) -> Option<i64> {
    inventory
        .and_then(|inv| inv.source_record(key))
        .and_then(id_of)
}

/// Looks up the ids of `slugs` on a Netbox list endpoint.
///
/// Slugs that do not exist are absent from the returned map.
pub(crate) async fn resolve_slugs(
    client: &NetboxClient,
    endpoint: &str,
    slugs: BTreeSet<String>,
) -> Result<BTreeMap<String, i64>, RemoteError> {
    let lookups = slugs.into_iter().map(|slug| async move {
        let query = [("slug".to_string(), slug.clone())];
        let found = client.find_one(endpoint, &query).await?;
        Ok::<_, RemoteError>((slug, found.as_ref().and_then(id_of)))
    });
    let resolved: BTreeMap<String, i64> = try_join_all(lookups)
        .await?
        .into_iter()
        .filter_map(|(slug, id)| id.map(|id| (slug, id)))
        .collect();
    debug!("{endpoint}: resolved {} slugs", resolved.len());
    Ok(resolved)
}

/// Looks up device ids by name.
pub(crate) async fn resolve_devices(
    client: &NetboxClient,
    names: BTreeSet<String>,
) -> Result<BTreeMap<String, i64>, RemoteError> {
    let lookups = names.into_iter().map(|name| async move {
        let query = [("name".to_string(), name.clone())];
        let found = client.find_one("dcim/devices/", &query).await?;
        Ok::<_, RemoteError>((name, found.as_ref().and_then(id_of)))
    });
    Ok(try_join_all(lookups)
        .await?
        .into_iter()
        .filter_map(|(name, id)| id.map(|id| (name, id)))
        .collect())
}
