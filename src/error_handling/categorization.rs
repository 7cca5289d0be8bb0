//! Failure categorization.
//!
//! Maps per-item remote failures onto [`FailureType`] so the run summary can
//! group them.

use super::types::{FailureType, RemoteError};

/// Categorizes an HTTP status code returned by a corrective call.
pub fn categorize_status(status: u16) -> FailureType {
    match status {
        400 | 422 => FailureType::BadRequest,
        401 | 403 => FailureType::Unauthorized,
        404 => FailureType::NotFound,
        409 => FailureType::Conflict,
        500..=599 => FailureType::ServerError,
        _ => FailureType::Other,
    }
}

/// Categorizes a transport-level failure.
pub fn categorize_remote_error(error: &RemoteError) -> FailureType {
    match error {
        RemoteError::Timeout { .. } => FailureType::Timeout,
        RemoteError::Status { status, .. } => categorize_status(*status),
        RemoteError::Request(err) => {
            if err.is_timeout() {
                FailureType::Timeout
            } else if err.is_connect() {
                FailureType::Connect
            } else if let Some(status) = err.status() {
                categorize_status(status.as_u16())
            } else {
                FailureType::Other
            }
        }
        RemoteError::Decode { .. } | RemoteError::Filter(_) | RemoteError::Closed => {
            FailureType::Other
        }
    }
}
