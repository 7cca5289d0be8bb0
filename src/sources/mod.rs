//! Concrete collectors for IP Fabric (source of truth) and Netbox (sync target).

pub mod ipfabric;
pub mod netbox;

use std::sync::Arc;

use serde_json::{json, Value};

use crate::collector::FetchParams;
use crate::config::Normalizer;
use crate::error_handling::RemoteError;
use crate::remote::{parse_filter, IpFabricClient, NetboxClient};

pub use crate::collector::{CollectionKind, SourceKind};

/// Shared handles every collector is built from.
#[derive(Clone)]
pub struct Sources {
    pub netbox: Arc<NetboxClient>,
    pub ipfabric: Arc<IpFabricClient>,
    pub normalizer: Arc<Normalizer>,
}

/// Builds the IP Fabric JSON filter for one fetch.
///
/// A `hostname` parameter is and-ed with any filter expression.
pub(crate) fn ipfabric_filter(params: &FetchParams) -> Result<Option<Value>, RemoteError> {
    let expr = params.filter.as_deref().map(parse_filter).transpose()?;
    let host = params
        .hostname
        .as_ref()
        .map(|h| json!({ "hostname": ["eq", h] }));
    Ok(match (expr, host) {
        (Some(expr), Some(host)) => Some(json!({ "and": [expr, host] })),
        (expr, host) => expr.or(host),
    })
}

/// Netbox query parameters for one fetch.
pub(crate) fn netbox_query(params: &FetchParams, host_param: &str) -> Vec<(String, String)> {
    let mut query = Vec::new();
    if let Some(hostname) = &params.hostname {
        query.push((host_param.to_string(), hostname.clone()));
    }
    if let Some(name) = &params.name {
        query.push(("name".to_string(), name.clone()));
    }
    query
}

/// Sources whose clients point at unroutable addresses, for tests that never
/// reach the network.
#[cfg(test)]
pub(crate) fn offline_sources(normalizer: Normalizer) -> Sources {
    use std::time::Duration;

    let netbox = NetboxClient::new(
        reqwest::Client::new(),
        url::Url::parse("http://netbox.invalid/api/").unwrap(),
        1,
        Duration::from_secs(1),
        100,
    );
    let ipfabric = IpFabricClient::new(
        reqwest::Client::new(),
        url::Url::parse("http://ipfabric.invalid/api/v1/").unwrap(),
        1,
        Duration::from_secs(1),
        1000,
    );
    Sources {
        netbox: Arc::new(netbox),
        ipfabric: Arc::new(ipfabric),
        normalizer: Arc::new(normalizer),
    }
}
