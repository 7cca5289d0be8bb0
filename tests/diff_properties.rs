//! Property tests for the diff engine.
//!
//! Inventories are generated from small name alphabets so that the two sides
//! overlap often.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use serde_json::json;

use inventory_sync::collector::Inventory;
use inventory_sync::diff::{diff, Comparator, FieldComparators};
use inventory_sync::model::{Fingerprint, Key};

fn inventory(entries: &BTreeMap<String, String>) -> Inventory {
    let mut inventory = Inventory::with_fields(&["name", "description"], &["name"]);
    for (name, description) in entries {
        let fingerprint = Fingerprint::new()
            .with("name", name.as_str())
            .with("description", description.as_str());
        let record = json!({"name": name, "description": description});
        inventory.insert(Key::from([name.as_str()]), fingerprint, record);
    }
    inventory
}

fn entries() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map("[a-f]{1,2}", "[xyXY]{0,2}", 0..12)
}

fn names(keys: impl Iterator<Item = Key>) -> BTreeSet<String> {
    keys.map(|key| key.text(0).to_string()).collect()
}

proptest! {
    #[test]
    fn test_buckets_partition_by_key(from in entries(), to in entries()) {
        let result = diff(&inventory(&from), &inventory(&to), None);

        let from_names: BTreeSet<String> = from.keys().cloned().collect();
        let to_names: BTreeSet<String> = to.keys().cloned().collect();
        let expected_missing: BTreeSet<String> = from_names.difference(&to_names).cloned().collect();
        let expected_extra: BTreeSet<String> = to_names.difference(&from_names).cloned().collect();
        let expected_changed: BTreeSet<String> = from
            .iter()
            .filter(|(name, desc)| to.get(*name).is_some_and(|other| other != *desc))
            .map(|(name, _)| name.clone())
            .collect();

        match result {
            None => {
                prop_assert!(expected_missing.is_empty());
                prop_assert!(expected_extra.is_empty());
                prop_assert!(expected_changed.is_empty());
            }
            Some(result) => {
                prop_assert!(!result.is_empty());
                prop_assert_eq!(names(result.missing.keys().cloned()), expected_missing);
                prop_assert_eq!(names(result.extra.keys().cloned()), expected_extra);
                prop_assert_eq!(names(result.changes.keys().cloned()), expected_changed);
            }
        }
    }

    #[test]
    fn test_identical_sides_never_differ(side in entries()) {
        prop_assert!(diff(&inventory(&side), &inventory(&side), None).is_none());
    }

    #[test]
    fn test_changes_carry_source_value(from in entries(), to in entries()) {
        if let Some(result) = diff(&inventory(&from), &inventory(&to), None) {
            for (key, change) in &result.changes {
                let name = key.text(0);
                prop_assert_eq!(change.fields.len(), 1);
                prop_assert_eq!(
                    change.fields.get("description").and_then(|v| v.as_text()),
                    from.get(name).map(String::as_str)
                );
                prop_assert_eq!(change.fingerprint.text("description"), to[name].as_str());
            }
        }
    }

    #[test]
    fn test_case_insensitive_comparator_hides_case_changes(side in entries()) {
        let upper: BTreeMap<String, String> = side
            .iter()
            .map(|(name, desc)| (name.clone(), desc.to_uppercase()))
            .collect();
        let mut comparators = FieldComparators::new();
        comparators.insert("description".to_string(), Comparator::lower());

        prop_assert!(diff(&inventory(&side), &inventory(&upper), Some(&comparators)).is_none());
    }
}
