// Shared test helpers: an in-memory collector backed by a mutable record store.
//
// Corrective operations mutate the store, so running a reconciliation twice
// over the same stores shows whether the first run converged.

#![allow(dead_code)] // Each test binary uses a different subset

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use inventory_sync::collector::{
    Action, CollectionKind, Collector, FetchParams, Inventory, ItemOutcome, SourceKind,
    SyncContext,
};
use inventory_sync::diff::Change;
use inventory_sync::error_handling::{FingerprintError, ReconcileError, RemoteError};
use inventory_sync::model::{text_at, Fingerprint, Key, SourceRecord};

/// Records of one side, shared between collector instances.
pub type Store = Arc<Mutex<Vec<Value>>>;

pub fn store(records: Vec<Value>) -> Store {
    Arc::new(Mutex::new(records))
}

pub fn interface(hostname: &str, name: &str, description: &str) -> Value {
    json!({"hostname": hostname, "interface": name, "description": description})
}

/// Interface collector over a [`Store`].
///
/// Every record carries `hostname`, `interface` and `description` as text.
pub struct FakeInterfaces {
    source: SourceKind,
    inventory: Inventory,
    store: Store,
}

impl FakeInterfaces {
    pub fn ipfabric(store: &Store) -> Self {
        Self::new(SourceKind::IpFabric, store)
    }

    pub fn netbox(store: &Store) -> Self {
        Self::new(SourceKind::Netbox, store)
    }

    fn new(source: SourceKind, store: &Store) -> Self {
        FakeInterfaces {
            source,
            inventory: Inventory::for_kind(CollectionKind::Interfaces),
            store: Arc::clone(store),
        }
    }

    fn matches(record: &Value, key: &Key) -> bool {
        record["hostname"] == key.text(0) && record["interface"] == key.text(1)
    }
}

fn record_from(fingerprint: &Fingerprint) -> Value {
    let fields: Map<String, Value> = fingerprint
        .fields()
        .map(|(field, value)| (field.clone(), json!(value.as_text().unwrap_or(""))))
        .collect();
    Value::Object(fields)
}

#[async_trait]
impl Collector for FakeInterfaces {
    fn kind(&self) -> CollectionKind {
        CollectionKind::Interfaces
    }

    fn source(&self) -> SourceKind {
        self.source
    }

    fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.inventory
    }

    async fn fetch_records(&self, params: &FetchParams) -> Result<Vec<SourceRecord>, RemoteError> {
        let records = self.store.lock().unwrap();
        Ok(records
            .iter()
            .filter(|r| {
                params
                    .hostname
                    .as_deref()
                    .map_or(true, |h| r["hostname"] == h)
            })
            .cloned()
            .collect())
    }

    fn fingerprint(&self, record: &SourceRecord) -> Result<Fingerprint, FingerprintError> {
        Ok(Fingerprint::new()
            .with("hostname", text_at(record, "hostname")?)
            .with("interface", text_at(record, "interface")?)
            .with("description", text_at(record, "description")?))
    }

    async fn create_missing(
        &self,
        missing: &BTreeMap<Key, Fingerprint>,
        _ctx: &SyncContext<'_>,
    ) -> Result<Vec<ItemOutcome>, ReconcileError> {
        let mut records = self.store.lock().unwrap();
        Ok(missing
            .iter()
            .map(|(key, fp)| {
                let record = record_from(fp);
                records.push(record.clone());
                ItemOutcome::succeeded(key.clone(), Action::Create, Some(record))
            })
            .collect())
    }

    async fn update_changes(
        &self,
        changes: &BTreeMap<Key, Change>,
        _ctx: &SyncContext<'_>,
    ) -> Result<Vec<ItemOutcome>, ReconcileError> {
        let mut records = self.store.lock().unwrap();
        Ok(changes
            .iter()
            .map(|(key, change)| {
                match records.iter_mut().find(|r| Self::matches(r, key)) {
                    Some(record) => {
                        for (field, value) in &change.fields {
                            record[field.as_str()] = json!(value.as_text().unwrap_or(""));
                        }
                        ItemOutcome::succeeded(key.clone(), Action::Update, None)
                    }
                    None => ItemOutcome::skipped(key.clone(), Action::Update, "no such record"),
                }
            })
            .collect())
    }

    async fn remove_extra(
        &self,
        extra: &BTreeMap<Key, Fingerprint>,
        _ctx: &SyncContext<'_>,
    ) -> Result<Vec<ItemOutcome>, ReconcileError> {
        let mut records = self.store.lock().unwrap();
        records.retain(|r| !extra.keys().any(|key| Self::matches(r, key)));
        Ok(extra
            .keys()
            .map(|key| ItemOutcome::succeeded(key.clone(), Action::Remove, None))
            .collect())
    }
}
