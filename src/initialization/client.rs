//! HTTP client initialization.
//!
//! Builds one `reqwest::Client` per remote API with its authentication header
//! installed as a default header, then wraps it in the API client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::ClientBuilder;
use url::Url;

use crate::config::{Config, IPFABRIC_PAGE_SIZE};
use crate::error_handling::InitializationError;
use crate::remote::{IpFabricClient, NetboxClient};

/// Normalizes `<addr>` into `<addr>/<suffix>/` so relative joins keep the prefix.
fn api_base(addr: &str, suffix: &str) -> Result<Url, InitializationError> {
    let joined = format!("{}/{}/", addr.trim_end_matches('/'), suffix);
    Url::parse(&joined).map_err(|source| InitializationError::BaseAddressError {
        addr: addr.to_string(),
        source,
    })
}

fn build_http(config: &Config, headers: HeaderMap) -> Result<reqwest::Client, InitializationError> {
    let client = ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .danger_accept_invalid_certs(config.insecure)
        .build()?;
    Ok(client)
}

/// Initializes the Netbox client.
///
/// Sends `Authorization: Token <token>` on every request.
///
/// # Errors
///
/// Returns an error if the address is not a URL, the token cannot be sent as
/// a header value, or client creation fails.
pub fn init_netbox_client(config: &Config) -> Result<Arc<NetboxClient>, InitializationError> {
    let mut headers = HeaderMap::new();
    let mut token = HeaderValue::from_str(&format!("Token {}", config.netbox_token))
        .map_err(|_| InitializationError::TokenError("Netbox"))?;
    token.set_sensitive(true);
    headers.insert(AUTHORIZATION, token);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let http = build_http(config, headers)?;
    Ok(Arc::new(NetboxClient::new(
        http,
        api_base(&config.netbox_addr, "api")?,
        config.api_concurrency,
        Duration::from_secs(config.timeout_seconds),
        config.page_size,
    )))
}

/// Initializes the IP Fabric client.
///
/// Sends `X-API-Token: <token>` on every request.
pub fn init_ipfabric_client(config: &Config) -> Result<Arc<IpFabricClient>, InitializationError> {
    let mut headers = HeaderMap::new();
    let mut token = HeaderValue::from_str(&config.ipfabric_token)
        .map_err(|_| InitializationError::TokenError("IP Fabric"))?;
    token.set_sensitive(true);
    headers.insert(HeaderName::from_static("x-api-token"), token);

    let http = build_http(config, headers)?;
    Ok(Arc::new(IpFabricClient::new(
        http,
        api_base(&config.ipfabric_addr, "api/v1")?,
        config.api_concurrency,
        Duration::from_secs(config.timeout_seconds),
        IPFABRIC_PAGE_SIZE,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_appends_suffix() {
        assert_eq!(
            api_base("https://netbox.example.com/", "api").unwrap().as_str(),
            "https://netbox.example.com/api/"
        );
        assert_eq!(
            api_base("https://ipf.example.com", "api/v1").unwrap().as_str(),
            "https://ipf.example.com/api/v1/"
        );
    }

    #[test]
    fn test_api_base_rejects_garbage() {
        assert!(matches!(
            api_base("not a url", "api"),
            Err(InitializationError::BaseAddressError { .. })
        ));
    }

    #[test]
    fn test_token_with_newline_rejected() {
        let config = Config {
            netbox_addr: "https://nb".into(),
            netbox_token: "bad\ntoken".into(),
            ..Default::default()
        };
        assert!(matches!(
            init_netbox_client(&config),
            Err(InitializationError::TokenError("Netbox"))
        ));
    }
}
