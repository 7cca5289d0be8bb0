//! Raw source record access.

use serde_json::Value;

use crate::error_handling::FingerprintError;

/// A record exactly as returned by a remote API (always a JSON object).
pub type SourceRecord = Value;

/// Looks up a dotted path (`"device_type.manufacturer.slug"`) in a record.
pub fn field_at<'a>(record: &'a SourceRecord, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(record, |value, segment| value.get(segment))
}

/// Text at `path`; a missing path or a non-scalar value is a fingerprint failure.
///
/// Numbers and booleans are rendered as text, since some tables report
/// serial numbers or descriptions as bare numbers.
pub fn text_at(record: &SourceRecord, path: &str) -> Result<String, FingerprintError> {
    match field_at(record, path) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(Value::Null) | None => Err(FingerprintError::missing_field(path, record)),
        Some(_) => Err(FingerprintError::malformed(
            format!("field '{path}' is not a scalar"),
            record,
        )),
    }
}

/// Like [`text_at`], but `null` and missing values are `None`.
pub fn opt_text_at(record: &SourceRecord, path: &str) -> Option<String> {
    match field_at(record, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
