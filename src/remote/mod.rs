//! Remote API clients.
//!
//! Both clients own their own request permit pool and wrap every call in the
//! configured timeout. Bulk fetches treat non-success responses as errors;
//! corrective calls return the raw [`ApiResponse`] so each item's outcome can
//! be reported individually.

pub mod filters;
mod ipfabric;
mod netbox;

use reqwest::Method;
use serde_json::Value;

use crate::error_handling::RemoteError;

pub use filters::parse_filter;
pub use ipfabric::IpFabricClient;
pub use netbox::NetboxClient;

/// One planned remote call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base (`dcim/devices/7/`)
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path, None)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path, Some(body))
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path, Some(body))
    }

    fn new(method: Method, path: impl Into<String>, body: Option<Value>) -> Self {
        ApiRequest {
            method,
            path: path.into(),
            query: Vec::new(),
            body,
        }
    }
}

/// Response to a remote call that reached the server.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body; `Null` when the body was empty or not JSON
    pub body: Value,
    /// Raw body text
    pub text: String,
}

impl ApiResponse {
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// Result of one corrective call.
pub type OpResult = Result<ApiResponse, RemoteError>;

/// Extracts the `results` array of a Netbox list response.
pub(crate) fn results_of(path: &str, body: Value) -> Result<Vec<Value>, RemoteError> {
    match body {
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(RemoteError::Decode {
                path: path.to_string(),
                message: "response has no 'results' array".into(),
            }),
        },
        _ => Err(RemoteError::Decode {
            path: path.to_string(),
            message: "response is not a JSON object".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_response_is_error() {
        let ok = ApiResponse {
            status: 201,
            body: json!({"id": 1}),
            text: String::new(),
        };
        let bad = ApiResponse {
            status: 400,
            body: Value::Null,
            text: "bad".into(),
        };
        assert!(!ok.is_error());
        assert!(bad.is_error());
    }

    #[test]
    fn test_request_builders() {
        let req = ApiRequest::get("dcim/sites/");
        assert_eq!(req.method, Method::GET);
        assert!(req.query.is_empty());
        assert!(req.body.is_none());
        let req = ApiRequest::patch("dcim/devices/3/", json!({"serial": "X"}));
        assert_eq!(req.method, Method::PATCH);
        assert_eq!(req.body, Some(json!({"serial": "X"})));
    }

    #[test]
    fn test_results_of() {
        let items = results_of("x", json!({"count": 1, "results": [{"id": 1}]})).unwrap();
        assert_eq!(items, vec![json!({"id": 1})]);
        assert!(results_of("x", json!({"count": 0})).is_err());
        assert!(results_of("x", json!([1, 2])).is_err());
    }
}
