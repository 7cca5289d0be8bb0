//! Record list and indexes owned by one collector.

use std::collections::BTreeMap;

use log::warn;

use super::kind::CollectionKind;
use crate::error_handling::FingerprintError;
use crate::model::{FieldValue, Fingerprint, Key, SourceRecord};

/// Fetched records plus the two key-ordered indexes built from them.
///
/// `keys` maps each key to its fingerprint; `source_records` maps the same key
/// to the raw record it came from, so remote ids can be recovered after diffing.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    fields: Vec<String>,
    key_fields: Vec<String>,
    records: Vec<SourceRecord>,
    keys: BTreeMap<Key, Fingerprint>,
    source_records: BTreeMap<Key, SourceRecord>,
}

impl Inventory {
    pub fn for_kind(kind: CollectionKind) -> Self {
        Self::with_fields(kind.fingerprint_fields(), kind.key_fields())
    }

    pub fn with_fields(fields: &[&str], key_fields: &[&str]) -> Self {
        Inventory {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            key_fields: key_fields.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn key_fields(&self) -> &[String] {
        &self.key_fields
    }

    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    pub fn extend_records(&mut self, records: impl IntoIterator<Item = SourceRecord>) {
        self.records.extend(records);
    }

    pub fn keys(&self) -> &BTreeMap<Key, Fingerprint> {
        &self.keys
    }

    pub fn get(&self, key: &Key) -> Option<&Fingerprint> {
        self.keys.get(key)
    }

    pub fn source_record(&self, key: &Key) -> Option<&SourceRecord> {
        self.source_records.get(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Entries whose `field` equals `value`.
    pub fn find_by<'a>(
        &'a self,
        field: &'a str,
        value: &'a FieldValue,
    ) -> impl Iterator<Item = (&'a Key, &'a Fingerprint)> + 'a {
        self.keys
            .iter()
            .filter(move |(_, fp)| fp.get(field) == Some(value))
    }

    /// Source record of the first entry whose `field` is the text `value`.
    pub fn source_record_by(&self, field: &str, value: &str) -> Option<&SourceRecord> {
        let value = FieldValue::from(value);
        let found = self
            .find_by(field, &value)
            .next()
            .and_then(|(key, _)| self.source_records.get(key));
        found
    }

    /// Inserts one indexed entry directly.
    pub fn insert(&mut self, key: Key, fingerprint: Fingerprint, record: SourceRecord) {
        self.keys.insert(key.clone(), fingerprint);
        self.source_records.insert(key, record);
    }

    /// Checks that a fingerprint carries every declared field.
    pub fn validate(
        &self,
        fingerprint: &Fingerprint,
        record: &SourceRecord,
    ) -> Result<(), FingerprintError> {
        match self
            .fields
            .iter()
            .chain(self.key_fields.iter())
            .find(|field| !fingerprint.contains(field))
        {
            Some(field) => Err(FingerprintError::missing_field(field.as_str(), record)),
            None => Ok(()),
        }
    }

    /// Installs indexed entries, replacing the existing indexes when `replace`.
    ///
    /// A later entry with the same key wins, with a warning.
    pub(crate) fn install(&mut self, entries: Vec<(Key, Fingerprint, SourceRecord)>, replace: bool) {
        if replace {
            self.keys.clear();
            self.source_records.clear();
        }
        for (key, fingerprint, record) in entries {
            if self.keys.contains_key(&key) {
                warn!("Replacing indexed record for key ({key})");
            }
            self.insert(key, fingerprint, record);
        }
    }
}
