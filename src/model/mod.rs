//! Fingerprint and key model.
//!
//! Every collector reduces its raw source records to a [`Fingerprint`]: an
//! ordered map of a fixed set of named fields. A [`Key`] is the tuple of key
//! fields pulled out of a fingerprint, and is what the diff engine compares
//! across the two sources.

mod record;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

pub use record::{field_at, opt_text_at, text_at, SourceRecord};

/// A single normalized fingerprint value.
///
/// Values are totally ordered so they can be used inside a [`Key`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Explicitly absent value (e.g. a device without a primary IP)
    Null,
    /// Text value
    Text(String),
    /// Integer value
    Int(i64),
    /// Boolean value
    Bool(bool),
    /// Unordered set of names (e.g. LAG member interfaces)
    Set(BTreeSet<String>),
}

impl FieldValue {
    /// Returns the text value, or `None` for non-text variants.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true for `Null` and for empty text.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Applies `f` to every string carried by this value.
    pub fn map_text(&self, f: impl Fn(&str) -> String) -> FieldValue {
        match self {
            FieldValue::Text(s) => FieldValue::Text(f(s)),
            FieldValue::Set(items) => FieldValue::Set(items.iter().map(|s| f(s)).collect()),
            other => other.clone(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("(empty)"),
            FieldValue::Text(s) if s.is_empty() => f.write_str("(empty)"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Int(n) => write!(f, "{n}"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Set(items) => {
                let joined: Vec<&str> = items.iter().map(String::as_str).collect();
                write!(f, "{{{}}}", joined.join(", "))
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Int(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map(FieldValue::Text).unwrap_or(FieldValue::Null)
    }
}

impl From<BTreeSet<String>> for FieldValue {
    fn from(items: BTreeSet<String>) -> Self {
        FieldValue::Set(items)
    }
}

/// Normalized view of one source record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Fingerprint(BTreeMap<String, FieldValue>);

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<FieldValue>) {
        self.0.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    /// Text of `field`, or an empty string when the field is absent or not text.
    pub fn text(&self, field: &str) -> &str {
        self.0.get(field).and_then(FieldValue::as_text).unwrap_or("")
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    /// Extracts the key tuple for `key_fields`, in order.
    ///
    /// Returns the first missing field name on failure.
    pub fn key_for<S: AsRef<str>>(&self, key_fields: &[S]) -> Result<Key, String> {
        key_fields
            .iter()
            .map(|field| {
                self.0
                    .get(field.as_ref())
                    .cloned()
                    .ok_or_else(|| field.as_ref().to_string())
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Key)
    }
}

impl<const N: usize> From<[(&str, FieldValue); N]> for Fingerprint {
    fn from(pairs: [(&str, FieldValue); N]) -> Self {
        Fingerprint(
            pairs
                .into_iter()
                .map(|(field, value)| (field.to_string(), value))
                .collect(),
        )
    }
}

/// Stable identity of one logical entity across both sources.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Key(pub Vec<FieldValue>);

impl Key {
    pub fn parts(&self) -> &[FieldValue] {
        &self.0
    }

    /// Text of the key part at `index`, empty when absent or not text.
    pub fn text(&self, index: usize) -> &str {
        self.0.get(index).and_then(FieldValue::as_text).unwrap_or("")
    }
}

impl<const N: usize> From<[&str; N]> for Key {
    fn from(parts: [&str; N]) -> Self {
        Key(parts.into_iter().map(FieldValue::from).collect())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(", "))
    }
}
