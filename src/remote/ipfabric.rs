//! IP Fabric table client.

use std::time::Duration;

use log::debug;
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use url::Url;

use crate::config::IPFABRIC_SNAPSHOT;
use crate::error_handling::RemoteError;

/// Columns requested for the device inventory table.
pub const DEVICE_COLUMNS: &[&str] = &[
    "id", "sn", "hostname", "siteName", "loginIp", "family", "vendor", "model",
];

/// Client for the IP Fabric API (`<addr>/api/v1/`).
pub struct IpFabricClient {
    http: reqwest::Client,
    base: Url,
    permits: Semaphore,
    timeout: Duration,
    page_size: usize,
}

impl IpFabricClient {
    pub fn new(
        http: reqwest::Client,
        base: Url,
        api_concurrency: usize,
        timeout: Duration,
        page_size: usize,
    ) -> Self {
        IpFabricClient {
            http,
            base,
            permits: Semaphore::new(api_concurrency.max(1)),
            timeout,
            page_size: page_size.max(1),
        }
    }

    async fn post_table(&self, table: &str, body: &Value) -> Result<Value, RemoteError> {
        let url = self
            .base
            .join(table.trim_start_matches('/'))
            .map_err(|e| RemoteError::Decode {
                path: table.to_string(),
                message: e.to_string(),
            })?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| RemoteError::Closed)?;

        let secs = self.timeout.as_secs();
        let (status, text) = tokio::time::timeout(self.timeout, async {
            let response = self.http.post(url).json(body).send().await?;
            let status = response.status().as_u16();
            let text = response.text().await?;
            Ok::<_, RemoteError>((status, text))
        })
        .await
        .map_err(|_| RemoteError::Timeout { secs })??;

        if status >= 400 {
            return Err(RemoteError::Status {
                method: "POST".into(),
                path: table.to_string(),
                status,
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| RemoteError::Decode {
            path: table.to_string(),
            message: e.to_string(),
        })
    }

    /// Fetches all rows of a table from the latest snapshot.
    ///
    /// Pages sequentially until a short page, or until `_meta.count` rows
    /// have been collected.
    pub async fn fetch_table(
        &self,
        table: &str,
        columns: &[&str],
        filters: Option<Value>,
    ) -> Result<Vec<Value>, RemoteError> {
        let filters = filters.unwrap_or_else(|| json!({}));
        let mut rows = Vec::new();
        let mut start = 0usize;

        loop {
            let body = json!({
                "columns": columns,
                "filters": filters,
                "snapshot": IPFABRIC_SNAPSHOT,
                "pagination": {"start": start, "limit": self.page_size},
            });
            let mut reply = self.post_table(table, &body).await?;

            let page = match reply.get_mut("data").map(Value::take) {
                Some(Value::Array(page)) => page,
                _ => {
                    return Err(RemoteError::Decode {
                        path: table.to_string(),
                        message: "response has no 'data' array".into(),
                    })
                }
            };
            let total = reply
                .get("_meta")
                .and_then(|m| m.get("count"))
                .and_then(Value::as_u64)
                .map(|c| c as usize);

            let fetched = page.len();
            rows.extend(page);
            start += fetched;

            let exhausted = total.is_some_and(|total| rows.len() >= total);
            if fetched < self.page_size || exhausted {
                break;
            }
        }

        debug!("{table}: fetched {} rows", rows.len());
        Ok(rows)
    }

    /// Device inventory, optionally filtered.
    pub async fn fetch_devices(&self, filters: Option<Value>) -> Result<Vec<Value>, RemoteError> {
        self.fetch_table("tables/inventory/devices", DEVICE_COLUMNS, filters)
            .await
    }
}
