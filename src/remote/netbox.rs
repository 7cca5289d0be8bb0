//! Netbox REST client.

use std::time::Duration;

use futures::future::try_join_all;
use log::debug;
use serde_json::Value;
use tokio::sync::Semaphore;
use url::Url;

use super::{results_of, ApiRequest, ApiResponse, OpResult};
use crate::error_handling::RemoteError;

/// Client for the Netbox REST API (`<addr>/api/`).
///
/// Authentication headers are installed on the underlying `reqwest::Client`
/// by [`crate::initialization::init_netbox_client`].
pub struct NetboxClient {
    http: reqwest::Client,
    base: Url,
    permits: Semaphore,
    timeout: Duration,
    page_size: usize,
}

impl NetboxClient {
    pub fn new(
        http: reqwest::Client,
        base: Url,
        api_concurrency: usize,
        timeout: Duration,
        page_size: usize,
    ) -> Self {
        NetboxClient {
            http,
            base,
            permits: Semaphore::new(api_concurrency.max(1)),
            timeout,
            page_size: page_size.max(1),
        }
    }

    fn url(&self, path: &str) -> Result<Url, RemoteError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| RemoteError::Decode {
                path: path.to_string(),
                message: e.to_string(),
            })
    }

    /// Sends one request and returns the response whatever its status.
    pub async fn execute(&self, request: ApiRequest) -> OpResult {
        let url = self.url(&request.path)?;
        let mut builder = self.http.request(request.method.clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| RemoteError::Closed)?;
        debug!("{} {}", request.method, request.path);

        let secs = self.timeout.as_secs();
        tokio::time::timeout(self.timeout, async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let text = response.text().await?;
            let body = serde_json::from_str(&text).unwrap_or(Value::Null);
            Ok::<_, RemoteError>(ApiResponse { status, body, text })
        })
        .await
        .map_err(|_| RemoteError::Timeout { secs })?
    }

    /// GET that must succeed; returns the JSON body.
    pub async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, RemoteError> {
        let mut request = ApiRequest::get(path);
        request.query = query.to_vec();
        let response = self.execute(request).await?;
        if response.is_error() {
            return Err(RemoteError::Status {
                method: "GET".into(),
                path: path.to_string(),
                status: response.status,
                body: response.text,
            });
        }
        Ok(response.body)
    }

    /// First record matching `query`, if any.
    pub async fn find_one(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Option<Value>, RemoteError> {
        let body = self.get(path, query).await?;
        Ok(results_of(path, body)?.into_iter().next())
    }

    /// Fetches every record of a list endpoint.
    ///
    /// Issues a `limit=1` request to learn the total count, then fetches all
    /// pages concurrently. Records are returned in page order.
    pub async fn paginate(
        &self,
        path: &str,
        filters: &[(String, String)],
    ) -> Result<Vec<Value>, RemoteError> {
        let mut probe = filters.to_vec();
        probe.push(("limit".into(), "1".into()));
        let body = self.get(path, &probe).await?;
        let count = body
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| RemoteError::Decode {
                path: path.to_string(),
                message: "response has no 'count'".into(),
            })? as usize;

        let pages = (0..count).step_by(self.page_size).map(|offset| {
            let mut query = filters.to_vec();
            query.push(("limit".into(), self.page_size.to_string()));
            query.push(("offset".into(), offset.to_string()));
            async move {
                let body = self.get(path, &query).await?;
                results_of(path, body)
            }
        });

        let pages = try_join_all(pages).await?;
        debug!("{path}: fetched {count} records in {} pages", pages.len());
        Ok(pages.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join_keeps_api_prefix() {
        let base = Url::parse("https://netbox.example.com/api/").unwrap();
        let client = NetboxClient::new(
            reqwest::Client::new(),
            base,
            10,
            Duration::from_secs(5),
            100,
        );
        assert_eq!(
            client.url("/dcim/sites/").unwrap().as_str(),
            "https://netbox.example.com/api/dcim/sites/"
        );
        assert_eq!(
            client.url("dcim/devices/7/").unwrap().as_str(),
            "https://netbox.example.com/api/dcim/devices/7/"
        );
    }
}
