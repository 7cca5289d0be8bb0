//! Key/fingerprint diff between two inventories.
//!
//! The diff is directional: `source_from` is the source of truth and
//! `sync_to` is the target being corrected. Output is key-ordered.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use log::error;

use crate::collector::Inventory;
use crate::model::{FieldValue, Fingerprint, Key};

type NormalizeFn = dyn Fn(&FieldValue) -> FieldValue + Send + Sync;

/// Normalizes a field value before comparison.
///
/// Both sides are normalized independently; the field differs when the
/// normalized values differ.
#[derive(Clone)]
pub struct Comparator(Arc<NormalizeFn>);

impl Comparator {
    pub fn new(f: impl Fn(&FieldValue) -> FieldValue + Send + Sync + 'static) -> Self {
        Comparator(Arc::new(f))
    }

    pub fn identity() -> Self {
        Self::new(FieldValue::clone)
    }

    /// Never reports a difference.
    pub fn ignore() -> Self {
        Self::new(|_| FieldValue::Null)
    }

    pub fn upper() -> Self {
        Self::new(|v| v.map_text(str::to_uppercase))
    }

    pub fn lower() -> Self {
        Self::new(|v| v.map_text(str::to_lowercase))
    }

    pub fn strip_suffix(suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        Self::new(move |v| {
            v.map_text(|s| s.strip_suffix(suffix.as_str()).unwrap_or(s).to_string())
        })
    }

    pub fn normalize(&self, value: &FieldValue) -> FieldValue {
        (self.0)(value)
    }
}

impl fmt::Debug for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Comparator")
    }
}

/// Per-field comparators; fields without one compare by identity.
pub type FieldComparators = BTreeMap<String, Comparator>;

/// Fields of one shared key that differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Target's current fingerprint
    pub fingerprint: Fingerprint,
    /// Field → source-of-truth value
    pub fields: BTreeMap<String, FieldValue>,
}

/// Differences between two inventories. The three maps never share a key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// In the source of truth only
    pub missing: BTreeMap<Key, Fingerprint>,
    /// In the target only
    pub extra: BTreeMap<Key, Fingerprint>,
    /// In both, with differing fields
    pub changes: BTreeMap<Key, Change>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty() && self.changes.is_empty()
    }
}

/// Compares two inventories by key.
///
/// Returns `None` when there are no differences at all.
pub fn diff(
    source_from: &Inventory,
    sync_to: &Inventory,
    comparators: Option<&FieldComparators>,
) -> Option<DiffResult> {
    let from = source_from.keys();
    let to = sync_to.keys();

    let missing: BTreeMap<Key, Fingerprint> = from
        .iter()
        .filter(|(key, _)| !to.contains_key(key))
        .map(|(key, fp)| (key.clone(), fp.clone()))
        .collect();

    let extra: BTreeMap<Key, Fingerprint> = to
        .iter()
        .filter(|(key, _)| !from.contains_key(key))
        .map(|(key, fp)| (key.clone(), fp.clone()))
        .collect();

    let identity = Comparator::identity();
    let mut compared: BTreeMap<&str, &Comparator> = source_from
        .fields()
        .iter()
        .map(|field| (field.as_str(), &identity))
        .collect();
    if let Some(comparators) = comparators {
        for (field, cmp) in comparators {
            compared.insert(field.as_str(), cmp);
        }
    }

    let mut changes = BTreeMap::new();
    for (key, from_fp) in from {
        let Some(to_fp) = to.get(key) else {
            continue;
        };
        let mut fields = BTreeMap::new();
        for (field, cmp) in &compared {
            match (from_fp.get(field), to_fp.get(field)) {
                (Some(a), Some(b)) => {
                    if cmp.normalize(a) != cmp.normalize(b) {
                        fields.insert(field.to_string(), a.clone());
                    }
                }
                _ => error!("Field '{field}' missing from fingerprint for key ({key}); not compared"),
            }
        }
        if !fields.is_empty() {
            changes.insert(
                key.clone(),
                Change {
                    fingerprint: to_fp.clone(),
                    fields,
                },
            );
        }
    }

    let result = DiffResult {
        missing,
        extra,
        changes,
    };
    (!result.is_empty()).then_some(result)
}
