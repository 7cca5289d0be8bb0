//! Per-item results of corrective operations.

use std::fmt;

use log::{error, info, warn};

use crate::error_handling::{
    categorize_remote_error, categorize_status, FailureType, OutcomeKind,
};
use crate::model::{Key, SourceRecord};
use crate::remote::OpResult;

/// Corrective action applied to one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Update,
    Remove,
}

impl Action {
    /// Tag used in per-item log lines.
    pub fn tag(&self) -> &'static str {
        match self {
            Action::Create => "CREATE",
            Action::Update => "CHANGE",
            Action::Remove => "REMOVE",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Succeeded,
    Failed,
    Skipped,
}

/// Result for one key of a diff bucket.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub key: Key,
    pub action: Action,
    pub status: Status,
    /// Failure body or skip reason
    pub message: Option<String>,
    pub failure: Option<FailureType>,
    /// Record returned by the remote on success, if any
    pub record: Option<SourceRecord>,
}

impl ItemOutcome {
    pub fn succeeded(key: Key, action: Action, record: Option<SourceRecord>) -> Self {
        ItemOutcome {
            key,
            action,
            status: Status::Succeeded,
            message: None,
            failure: None,
            record,
        }
    }

    pub fn failed(key: Key, action: Action, message: String, failure: FailureType) -> Self {
        ItemOutcome {
            key,
            action,
            status: Status::Failed,
            message: Some(message),
            failure: Some(failure),
            record: None,
        }
    }

    pub fn skipped(key: Key, action: Action, reason: impl Into<String>) -> Self {
        ItemOutcome {
            key,
            action,
            status: Status::Skipped,
            message: Some(reason.into()),
            failure: None,
            record: None,
        }
    }

    /// Converts a remote call result; HTTP errors and transport errors both fail the item.
    pub fn from_result(key: Key, action: Action, result: OpResult) -> Self {
        match result {
            Ok(response) if response.is_error() => {
                let failure = categorize_status(response.status);
                ItemOutcome::failed(key, action, response.text, failure)
            }
            Ok(response) => {
                let record = response.body.is_object().then_some(response.body);
                ItemOutcome::succeeded(key, action, record)
            }
            Err(e) => {
                let failure = categorize_remote_error(&e);
                ItemOutcome::failed(key, action, e.to_string(), failure)
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Succeeded
    }

    /// Statistics bucket for this outcome.
    pub fn kind(&self) -> OutcomeKind {
        match (self.status, self.action) {
            (Status::Failed, _) => OutcomeKind::Failed,
            (Status::Skipped, _) => OutcomeKind::Skipped,
            (Status::Succeeded, Action::Create) => OutcomeKind::Created,
            (Status::Succeeded, Action::Update) => OutcomeKind::Updated,
            (Status::Succeeded, Action::Remove) => OutcomeKind::Removed,
        }
    }

    /// Logs the outcome as `CREATE:OK`, `CHANGE:FAIL` or `REMOVE:SKIP`.
    pub fn log(&self, what: &str) {
        let tag = self.action.tag();
        match self.status {
            Status::Succeeded => info!("{tag}:OK: {what} {}", self.key),
            Status::Failed => error!(
                "{tag}:FAIL: {what} {}: {}",
                self.key,
                self.message.as_deref().unwrap_or("")
            ),
            Status::Skipped => warn!(
                "{tag}:SKIP: {what} {}: {}",
                self.key,
                self.message.as_deref().unwrap_or("")
            ),
        }
    }
}

/// One skipped outcome per key, for collectors that cannot apply `action`.
pub fn skip_all<'a>(
    keys: impl IntoIterator<Item = &'a Key>,
    action: Action,
    reason: &str,
) -> Vec<ItemOutcome> {
    keys.into_iter()
        .map(|key| ItemOutcome::skipped(key.clone(), action, reason))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::RemoteError;
    use crate::remote::ApiResponse;
    use serde_json::{json, Value};

    #[test]
    fn test_from_result_success_keeps_record() {
        let response = ApiResponse {
            status: 201,
            body: json!({"id": 5, "slug": "atl1"}),
            text: String::new(),
        };
        let outcome = ItemOutcome::from_result(Key::from(["atl1"]), Action::Create, Ok(response));
        assert!(outcome.is_success());
        assert_eq!(outcome.kind(), OutcomeKind::Created);
        assert_eq!(outcome.record, Some(json!({"id": 5, "slug": "atl1"})));
    }

    #[test]
    fn test_from_result_http_error_is_failure() {
        let response = ApiResponse {
            status: 400,
            body: Value::Null,
            text: "{\"slug\": [\"already exists\"]}".into(),
        };
        let outcome = ItemOutcome::from_result(Key::from(["atl1"]), Action::Create, Ok(response));
        assert_eq!(outcome.status, Status::Failed);
        assert_eq!(outcome.failure, Some(FailureType::BadRequest));
        assert!(outcome.message.unwrap().contains("already exists"));
    }

    #[test]
    fn test_from_result_timeout_is_failure() {
        let outcome = ItemOutcome::from_result(
            Key::from(["SN1"]),
            Action::Update,
            Err(RemoteError::Timeout { secs: 3 }),
        );
        assert_eq!(outcome.kind(), OutcomeKind::Failed);
        assert_eq!(outcome.failure, Some(FailureType::Timeout));
    }

    #[test]
    fn test_skip_all_one_per_key() {
        let keys = [Key::from(["a"]), Key::from(["b"])];
        let outcomes = skip_all(keys.iter(), Action::Remove, "read-only");
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.kind() == OutcomeKind::Skipped));
    }
}
