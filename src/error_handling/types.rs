//! Error type definitions.
//!
//! This module defines all error, outcome, and failure types used throughout the application.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use serde_json::Value;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing an HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// A remote base address could not be parsed.
    #[error("Invalid base address '{addr}': {source}")]
    BaseAddressError {
        addr: String,
        #[source]
        source: url::ParseError,
    },

    /// A token contained characters that cannot be sent in a header.
    #[error("Invalid API token for {0}")]
    TokenError(&'static str),
}

/// Error types for configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The mappings file could not be read.
    #[error("Failed to read mappings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The mappings file is not valid TOML for the expected schema.
    #[error("Invalid mappings file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// A normalization pattern did not compile.
    #[error("Invalid normalization pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A required setting was not provided on the command line or environment.
    #[error("Missing required setting: {0}")]
    MissingValue(&'static str),
}

/// A source record could not be reduced to a fingerprint.
///
/// This is fatal to the `make_keys` call that hit it: a malformed record means
/// the field mapping for the whole collection is wrong, not that one item is.
#[derive(Error, Debug)]
pub enum FingerprintError {
    /// The record does not have the expected shape.
    #[error("Fingerprint failed: {reason}; record: {record}")]
    Malformed { reason: String, record: Box<Value> },

    /// A field required by the fingerprint (or its key) is absent.
    #[error("Fingerprint failed: missing field '{field}'; record: {record}")]
    MissingField { field: String, record: Box<Value> },
}

impl FingerprintError {
    pub fn malformed(reason: impl Into<String>, record: &Value) -> Self {
        FingerprintError::Malformed {
            reason: reason.into(),
            record: Box::new(record.clone()),
        }
    }

    pub fn missing_field(field: impl Into<String>, record: &Value) -> Self {
        FingerprintError::MissingField {
            field: field.into(),
            record: Box::new(record.clone()),
        }
    }

    /// The offending source record.
    pub fn record(&self) -> &Value {
        match self {
            FingerprintError::Malformed { record, .. } => record,
            FingerprintError::MissingField { record, .. } => record,
        }
    }
}

/// An IP Fabric filter expression could not be parsed.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid filter expression at offset {offset}: {message}")]
pub struct FilterError {
    pub offset: usize,
    pub message: String,
}

/// Remote call failure.
///
/// For corrective operations these are captured per item and never abort
/// sibling calls. For bulk fetches they are structural and abort the run.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Transport level failure (connection refused, TLS, body read).
    #[error("HTTP request failed: {0}")]
    Request(#[from] ReqwestError),

    /// The call did not complete within the configured timeout.
    #[error("Request timed out after {secs} seconds")]
    Timeout { secs: u64 },

    /// A fetch returned a non-success status.
    #[error("{method} {path} returned HTTP {status}: {body}")]
    Status {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    /// A response body did not have the expected structure.
    #[error("Unexpected response from {path}: {message}")]
    Decode { path: String, message: String },

    /// A fetch filter expression was invalid.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// The client's request permit pool was closed.
    #[error("API client is shut down")]
    Closed,
}

/// Internal fault of the bounded executor.
///
/// These are never per-item remote failures; they mean the batch itself is broken
/// and has been cancelled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// A submitted operation panicked.
    #[error("Operation panicked: {0}")]
    OperationPanicked(String),

    /// The submission pump panicked.
    #[error("Submission pump panicked")]
    PumpPanicked,

    /// The permit pool was closed while items were still pending.
    #[error("Concurrency permit pool closed")]
    SemaphoreClosed,
}

/// Failures that abort a reconciliation step.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// No collector is registered for this source and collection.
    #[error("NOT-FOUND: collection '{collection}' for source '{source_kind}'")]
    CollectorNotFound {
        source_kind: String,
        collection: String,
    },

    /// A task was invoked without enough parameters to scope its fetch.
    #[error("Missing parameters: {0}")]
    MissingParameters(&'static str),
}

/// Result categories for one corrective item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum OutcomeKind {
    Created,
    Updated,
    Removed,
    Skipped,
    Failed,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Created => "created",
            OutcomeKind::Updated => "updated",
            OutcomeKind::Removed => "removed",
            OutcomeKind::Skipped => "skipped",
            OutcomeKind::Failed => "failed",
        }
    }
}

/// Why a corrective item failed.
///
/// Used to summarize failures at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum FailureType {
    Timeout,
    Connect,
    BadRequest,   // 400, usually a validation error from Netbox
    Unauthorized, // 401/403
    NotFound,     // 404
    Conflict,     // 409
    ServerError,  // 5xx
    Other,
}

impl std::fmt::Display for FailureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FailureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureType::Timeout => "Request timeout",
            FailureType::Connect => "Connection error",
            FailureType::BadRequest => "Bad Request (400)",
            FailureType::Unauthorized => "Unauthorized (401/403)",
            FailureType::NotFound => "Not Found (404)",
            FailureType::Conflict => "Conflict (409)",
            FailureType::ServerError => "Server error (5xx)",
            FailureType::Other => "Other error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strum::IntoEnumIterator;

    #[test]
    fn test_failure_type_as_str() {
        assert_eq!(FailureType::BadRequest.as_str(), "Bad Request (400)");
        assert_eq!(FailureType::Timeout.to_string(), "Request timeout");
    }

    #[test]
    fn test_all_outcome_kinds_have_string_representation() {
        for kind in OutcomeKind::iter() {
            assert!(!kind.as_str().is_empty(), "{:?} should have a name", kind);
        }
    }

    #[test]
    fn test_fingerprint_error_carries_record() {
        let rec = json!({"hostname": "sw1"});
        let err = FingerprintError::missing_field("sn", &rec);
        assert_eq!(err.record(), &rec);
        let msg = err.to_string();
        assert!(msg.contains("missing field 'sn'"));
        assert!(msg.contains("sw1"));
    }

    #[test]
    fn test_reconcile_error_not_found_message() {
        let err = ReconcileError::CollectorNotFound {
            source_kind: "ipfabric".into(),
            collection: "vlans".into(),
        };
        assert_eq!(
            err.to_string(),
            "NOT-FOUND: collection 'vlans' for source 'ipfabric'"
        );
    }

    #[test]
    fn test_remote_status_error_message() {
        let err = RemoteError::Status {
            method: "GET".into(),
            path: "dcim/devices/".into(),
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "GET dcim/devices/ returned HTTP 500: boom");
    }
}
