//! Record collectors.
//!
//! A [`Collector`] fetches raw records of one entity kind from one source,
//! reduces each to a [`Fingerprint`], and indexes them by [`Key`] in its
//! [`Inventory`]. Sync-target collectors additionally implement the corrective
//! operations applied to a diff.

mod context;
mod inventory;
mod kind;
mod outcome;

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use log::info;

use crate::diff::Change;
use crate::error_handling::{FingerprintError, ReconcileError, RemoteError};
use crate::model::{Fingerprint, Key, SourceRecord};

pub use context::{SyncContext, SyncOptions};
pub use inventory::Inventory;
pub use kind::{CollectionKind, SourceKind};
pub use outcome::{skip_all, Action, ItemOutcome, Status};

/// Parameters narrowing one remote fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchParams {
    /// IP Fabric filter expression
    pub filter: Option<String>,
    /// Restrict to one device
    pub hostname: Option<String>,
    /// Restrict to one named record
    pub name: Option<String>,
}

impl FetchParams {
    pub fn filter(expr: impl Into<String>) -> Self {
        FetchParams {
            filter: Some(expr.into()),
            ..Default::default()
        }
    }

    pub fn hostname(hostname: impl Into<String>) -> Self {
        FetchParams {
            hostname: Some(hostname.into()),
            ..Default::default()
        }
    }
}

type KeyFilter = Box<dyn Fn(&Fingerprint) -> bool + Send + Sync>;
type KeyTranslate = Box<dyn Fn(Key) -> Key + Send + Sync>;

/// Options for [`Collector::make_keys`].
#[derive(Default)]
pub struct KeyOptions {
    /// Key fields overriding the collection's own
    pub fields: Option<Vec<String>>,
    /// Only fingerprints for which this returns true are indexed
    pub filter: Option<KeyFilter>,
    /// Post-processes each extracted key
    pub translate: Option<KeyTranslate>,
}

impl KeyOptions {
    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn with_filter(mut self, f: impl Fn(&Fingerprint) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Box::new(f));
        self
    }

    pub fn with_translate(mut self, f: impl Fn(Key) -> Key + Send + Sync + 'static) -> Self {
        self.translate = Some(Box::new(f));
        self
    }
}

/// Fetch, fingerprint and index records of one kind from one source.
#[async_trait]
pub trait Collector: Send + Sync {
    fn kind(&self) -> CollectionKind;

    fn source(&self) -> SourceKind;

    fn inventory(&self) -> &Inventory;

    fn inventory_mut(&mut self) -> &mut Inventory;

    /// One remote fetch; does not touch the inventory.
    async fn fetch_records(&self, params: &FetchParams) -> Result<Vec<SourceRecord>, RemoteError>;

    /// Reduces one record to its fingerprint.
    fn fingerprint(&self, record: &SourceRecord) -> Result<Fingerprint, FingerprintError>;

    /// Fetches and appends to the record list. Repeated calls are additive.
    async fn fetch(&mut self, params: &FetchParams) -> Result<usize, RemoteError> {
        let records = self.fetch_records(params).await?;
        let count = records.len();
        self.inventory_mut().extend_records(records);
        Ok(count)
    }

    /// Runs one fetch per parameter set, at most `limit` at a time, and
    /// appends every result in parameter order.
    async fn fetch_each(
        &mut self,
        params: Vec<FetchParams>,
        limit: usize,
    ) -> Result<usize, RemoteError> {
        let batches: Vec<Vec<SourceRecord>> = {
            let this = &*self;
            let fetches: Vec<_> = params.iter().map(|p| this.fetch_records(p)).collect();
            futures::stream::iter(fetches)
                .buffered(limit.max(1))
                .try_collect()
                .await?
        };
        let records: Vec<SourceRecord> = batches.into_iter().flatten().collect();
        let count = records.len();
        self.inventory_mut().extend_records(records);
        Ok(count)
    }

    /// Rebuilds both indexes from the full record list.
    ///
    /// Any fingerprint failure aborts the call and leaves the indexes unchanged.
    fn make_keys(&mut self, options: &KeyOptions) -> Result<(), FingerprintError> {
        if self.inventory().records().is_empty() {
            info!("{}/{}: no records to index", self.source(), self.kind());
            self.inventory_mut().install(Vec::new(), true);
            return Ok(());
        }
        let entries = index_records(&*self, self.inventory().records(), options)?;
        self.inventory_mut().install(entries, true);
        Ok(())
    }

    /// Appends `records` and merges them into the existing indexes.
    fn merge_records(
        &mut self,
        records: Vec<SourceRecord>,
        options: &KeyOptions,
    ) -> Result<(), FingerprintError> {
        let entries = index_records(&*self, &records, options)?;
        self.inventory_mut().extend_records(records);
        self.inventory_mut().install(entries, false);
        Ok(())
    }

    /// Creates the records missing from this source.
    async fn create_missing(
        &self,
        missing: &BTreeMap<Key, Fingerprint>,
        _ctx: &SyncContext<'_>,
    ) -> Result<Vec<ItemOutcome>, ReconcileError> {
        Ok(skip_all(missing.keys(), Action::Create, "source is read-only"))
    }

    /// Applies field changes to existing records.
    async fn update_changes(
        &self,
        changes: &BTreeMap<Key, Change>,
        _ctx: &SyncContext<'_>,
    ) -> Result<Vec<ItemOutcome>, ReconcileError> {
        Ok(skip_all(changes.keys(), Action::Update, "source is read-only"))
    }

    /// Removes (or unlinks) records absent from the source of truth.
    async fn remove_extra(
        &self,
        extra: &BTreeMap<Key, Fingerprint>,
        _ctx: &SyncContext<'_>,
    ) -> Result<Vec<ItemOutcome>, ReconcileError> {
        Ok(skip_all(extra.keys(), Action::Remove, "source is read-only"))
    }

    /// Indexes the records returned by successful creates.
    fn absorb(&mut self, outcomes: &[ItemOutcome]) -> Result<(), FingerprintError> {
        let created: Vec<SourceRecord> = outcomes
            .iter()
            .filter(|o| o.is_success() && o.action == Action::Create)
            .filter_map(|o| o.record.clone())
            .collect();
        if created.is_empty() {
            return Ok(());
        }
        self.merge_records(created, &KeyOptions::default())
    }
}

/// Fingerprints and keys `records` without touching the collector's indexes.
fn index_records<C: Collector + ?Sized>(
    collector: &C,
    records: &[SourceRecord],
    options: &KeyOptions,
) -> Result<Vec<(Key, Fingerprint, SourceRecord)>, FingerprintError> {
    let inventory = collector.inventory();
    let key_fields: &[String] = options.fields.as_deref().unwrap_or(inventory.key_fields());

    let mut entries = Vec::with_capacity(records.len());
    for record in records {
        let fingerprint = collector.fingerprint(record)?;
        inventory.validate(&fingerprint, record)?;
        if let Some(filter) = &options.filter {
            if !filter(&fingerprint) {
                continue;
            }
        }
        let key = fingerprint
            .key_for(key_fields)
            .map_err(|field| FingerprintError::missing_field(field, record))?;
        let key = match &options.translate {
            Some(translate) => translate(key),
            None => key,
        };
        entries.push((key, fingerprint, record.clone()));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{opt_text_at, text_at};
    use serde_json::json;

    struct Sites {
        inventory: Inventory,
        rows: Vec<SourceRecord>,
    }

    #[async_trait]
    impl Collector for Sites {
        fn kind(&self) -> CollectionKind {
            CollectionKind::Sites
        }
        fn source(&self) -> SourceKind {
            SourceKind::IpFabric
        }
        fn inventory(&self) -> &Inventory {
            &self.inventory
        }
        fn inventory_mut(&mut self) -> &mut Inventory {
            &mut self.inventory
        }
        async fn fetch_records(
            &self,
            params: &FetchParams,
        ) -> Result<Vec<SourceRecord>, RemoteError> {
            Ok(self
                .rows
                .iter()
                .filter(|r| params.name.as_deref().map_or(true, |n| r["siteName"] == n))
                .cloned()
                .collect())
        }
        fn fingerprint(&self, record: &SourceRecord) -> Result<Fingerprint, FingerprintError> {
            Ok(Fingerprint::new()
                .with("name", text_at(record, "siteName")?)
                .with("region", opt_text_at(record, "region").unwrap_or_default()))
        }
    }

    fn sites(rows: Vec<SourceRecord>) -> Sites {
        Sites {
            inventory: Inventory::for_kind(CollectionKind::Sites),
            rows,
        }
    }

    #[tokio::test]
    async fn test_fetch_is_additive_and_make_keys_indexes() {
        let mut col = sites(vec![json!({"siteName": "atl1"}), json!({"siteName": "nyc1"})]);
        let params = FetchParams {
            name: Some("atl1".into()),
            ..Default::default()
        };
        col.fetch(&params).await.unwrap();
        col.fetch(&FetchParams::default()).await.unwrap();
        assert_eq!(col.inventory().records().len(), 3);

        col.make_keys(&KeyOptions::default()).unwrap();
        assert_eq!(col.inventory().len(), 2);
        assert!(col.inventory().get(&Key::from(["nyc1"])).is_some());
    }

    #[tokio::test]
    async fn test_fetch_each_appends_in_order() {
        let mut col = sites(vec![json!({"siteName": "atl1"}), json!({"siteName": "nyc1"})]);
        let params = ["nyc1", "atl1"]
            .iter()
            .map(|n| FetchParams {
                name: Some(n.to_string()),
                ..Default::default()
            })
            .collect();
        let count = col.fetch_each(params, 1).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(col.inventory().records()[0]["siteName"], "nyc1");
    }

    #[test]
    fn test_make_keys_empty_is_ok() {
        let mut col = sites(Vec::new());
        col.make_keys(&KeyOptions::default()).unwrap();
        assert!(col.inventory().is_empty());
    }

    #[test]
    fn test_make_keys_failure_aborts_and_keeps_index() {
        let mut col = sites(Vec::new());
        col.inventory_mut().extend_records(vec![json!({"siteName": "atl1"})]);
        col.make_keys(&KeyOptions::default()).unwrap();

        col.inventory_mut().extend_records(vec![json!({"name": "broken"})]);
        let err = col.make_keys(&KeyOptions::default()).unwrap_err();
        assert_eq!(err.record(), &json!({"name": "broken"}));
        assert_eq!(col.inventory().len(), 1);
    }

    #[test]
    fn test_make_keys_filter_and_translate() {
        let mut col = sites(Vec::new());
        col.inventory_mut().extend_records(vec![
            json!({"siteName": "atl1"}),
            json!({"siteName": "lab"}),
        ]);
        let options = KeyOptions::default()
            .with_filter(|fp| fp.text("name") != "lab")
            .with_translate(|key| Key::from([key.text(0).to_uppercase().as_str()]));
        col.make_keys(&options).unwrap();
        assert_eq!(col.inventory().len(), 1);
        assert!(col.inventory().get(&Key::from(["ATL1"])).is_some());
    }

    #[test]
    fn test_make_keys_with_fields_overrides_key() {
        let mut col = sites(Vec::new());
        col.inventory_mut().extend_records(vec![
            json!({"siteName": "atl1", "region": "east"}),
            json!({"siteName": "nyc1", "region": "east"}),
            json!({"siteName": "sfo1", "region": "west"}),
        ]);

        col.make_keys(&KeyOptions::default().with_fields(&["region"])).unwrap();
        let keys: Vec<&Key> = col.inventory().keys().keys().collect();
        assert_eq!(keys, vec![&Key::from(["east"]), &Key::from(["west"])]);
        let east = col.inventory().source_record(&Key::from(["east"])).unwrap();
        assert_eq!(east["siteName"], "nyc1");

        col.make_keys(&KeyOptions::default()).unwrap();
        assert_eq!(col.inventory().len(), 3);
        assert!(col.inventory().get(&Key::from(["sfo1"])).is_some());

        let err = col
            .make_keys(&KeyOptions::default().with_fields(&["rack"]))
            .unwrap_err();
        assert!(matches!(err, FingerprintError::MissingField { .. }));
        assert_eq!(col.inventory().len(), 3);
    }

    #[test]
    fn test_absorb_merges_created_records() {
        let mut col = sites(Vec::new());
        col.inventory_mut().extend_records(vec![json!({"siteName": "atl1"})]);
        col.make_keys(&KeyOptions::default()).unwrap();

        let outcomes = vec![
            ItemOutcome::succeeded(
                Key::from(["nyc1"]),
                Action::Create,
                Some(json!({"siteName": "nyc1"})),
            ),
            ItemOutcome::skipped(Key::from(["sfo1"]), Action::Create, "no prerequisite"),
        ];
        col.absorb(&outcomes).unwrap();
        assert_eq!(col.inventory().len(), 2);
        assert!(col.inventory().get(&Key::from(["atl1"])).is_some());
        assert!(col.inventory().get(&Key::from(["nyc1"])).is_some());
    }

    #[tokio::test]
    async fn test_default_corrective_operations_skip_every_item() {
        let col = sites(Vec::new());
        let options = SyncOptions::default();
        let ctx = SyncContext::new(&options);
        let mut missing = BTreeMap::new();
        missing.insert(Key::from(["atl1"]), Fingerprint::new().with("name", "atl1"));
        let outcomes = col.create_missing(&missing, &ctx).await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, Status::Skipped);
    }
}
