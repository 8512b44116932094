//! Unit tests for the in-memory store and record filters.

use super::*;
use crate::element::ElementKind;
use rstest::{fixture, rstest};

fn record(element: ElementRef, value: &str, bbox: BoundingBox) -> IndexRecord<'_> {
    IndexRecord {
        element,
        value,
        has_nodes: false,
        has_ways: false,
        position: bbox.into(),
    }
}

fn point(lon: f64, lat: f64) -> BoundingBox {
    BoundingBox::new(lon, lat, lon, lat)
}

fn filter(bbox: BoundingBox) -> KeyFilter<'static> {
    KeyFilter {
        bbox,
        values: Vec::new(),
        kind: None,
        limit: 100,
    }
}

#[fixture]
fn amenity() -> TagKey {
    TagKey::sanitize("amenity")
}

#[fixture]
fn populated(amenity: TagKey) -> (MemoryTagIndexStore, TagKey) {
    let mut store = MemoryTagIndexStore::new();
    store.ensure_key(&amenity).expect("create tables");
    for (element, value, bbox) in [
        (ElementRef::node(1), "cafe", point(10.0, 10.0)),
        (ElementRef::node(2), "pub", point(11.0, 11.0)),
        (ElementRef::way(3), "cafe", BoundingBox::new(12.0, 12.0, 13.0, 13.0)),
        (ElementRef::node(4), "cafe", point(50.0, 50.0)),
    ] {
        store
            .insert_record(&amenity, &record(element, value, bbox))
            .expect("insert");
    }
    (store, amenity)
}

#[rstest]
#[case(vec![], None, true)]
#[case(vec!["cafe"], None, true)]
#[case(vec!["pub", "cafe"], None, true)]
#[case(vec!["pub"], None, false)]
#[case(vec![], Some(ElementKind::Node), true)]
#[case(vec![], Some(ElementKind::Way), false)]
fn key_filter_applies_value_and_type(
    #[case] values: Vec<&'static str>,
    #[case] kind: Option<ElementKind>,
    #[case] expected: bool,
) {
    let row = AttributeRecord {
        row_id: 1,
        element: ElementRef::node(1),
        value: "cafe".into(),
        kind: ElementKind::Node,
        has_nodes: false,
        has_ways: false,
    };
    let key_filter = KeyFilter {
        values,
        kind,
        ..filter(BoundingBox::WORLD)
    };
    assert_eq!(key_filter.accepts(&row), expected);
}

#[rstest]
fn query_returns_strictly_contained_rows_in_insertion_order(
    populated: (MemoryTagIndexStore, TagKey),
) {
    let (store, key) = populated;
    let found = store
        .query_key(&key, &filter(BoundingBox::new(9.0, 9.0, 20.0, 20.0)))
        .expect("query");
    assert_eq!(
        found,
        vec![ElementRef::node(1), ElementRef::node(2), ElementRef::way(3)]
    );
}

#[rstest]
fn query_excludes_rows_on_the_boundary(populated: (MemoryTagIndexStore, TagKey)) {
    let (store, key) = populated;
    let found = store
        .query_key(&key, &filter(BoundingBox::new(10.0, 9.0, 20.0, 20.0)))
        .expect("query");
    assert!(!found.contains(&ElementRef::node(1)));
}

#[rstest]
fn query_honours_filters_and_limit(populated: (MemoryTagIndexStore, TagKey)) {
    let (store, key) = populated;
    let cafes = KeyFilter {
        values: vec!["cafe"],
        limit: 2,
        ..filter(BoundingBox::WORLD)
    };
    assert_eq!(
        store.query_key(&key, &cafes).expect("query"),
        vec![ElementRef::node(1), ElementRef::way(3)]
    );

    let ways = KeyFilter {
        kind: Some(ElementKind::Way),
        ..filter(BoundingBox::WORLD)
    };
    assert_eq!(
        store.query_key(&key, &ways).expect("query"),
        vec![ElementRef::way(3)]
    );
}

#[rstest]
fn query_with_nan_bbox_matches_nothing(populated: (MemoryTagIndexStore, TagKey)) {
    let (store, key) = populated;
    let found = store
        .query_key(&key, &filter(BoundingBox::new(f64::NAN, -90.0, 180.0, 90.0)))
        .expect("query");
    assert!(found.is_empty());
}

#[rstest]
fn delete_row_removes_both_records(populated: (MemoryTagIndexStore, TagKey)) {
    let (mut store, key) = populated;
    let row = store
        .find_row(&key, &ElementRef::node(2))
        .expect("lookup")
        .expect("row exists");
    store.delete_row(&key, row).expect("delete");

    let rows = store.key_rows(&key).expect("rows");
    assert!(rows.positions.iter().all(|p| p.row_id != row));
    assert!(rows.attributes.iter().all(|a| a.row_id != row));
    assert_eq!(rows.positions.len(), rows.attributes.len());
    assert_eq!(store.find_row(&key, &ElementRef::node(2)).expect("lookup"), None);
}

#[rstest]
fn insert_into_unknown_key_fails() {
    let mut store = MemoryTagIndexStore::new();
    let err = store
        .insert_record(
            &TagKey::sanitize("shop"),
            &record(ElementRef::node(1), "bakery", point(1.0, 1.0)),
        )
        .expect_err("tables missing");
    assert!(matches!(err, StoreError::MissingTable { .. }));
}

#[rstest]
fn duplicate_element_is_rejected(populated: (MemoryTagIndexStore, TagKey)) {
    let (mut store, key) = populated;
    let err = store
        .insert_record(&key, &record(ElementRef::node(1), "bar", point(1.0, 1.0)))
        .expect_err("already filed");
    assert!(matches!(err, StoreError::DuplicateElement { .. }));
}

#[rstest]
fn rollback_restores_the_snapshot(populated: (MemoryTagIndexStore, TagKey)) {
    let (mut store, key) = populated;
    let shop = TagKey::sanitize("shop");
    store.begin().expect("begin");
    assert!(store.in_transaction());
    store.ensure_key(&shop).expect("create tables");
    store
        .set_element_keys(&ElementRef::node(9), std::slice::from_ref(&shop))
        .expect("write index");
    store.purge().expect("purge");
    store.rollback().expect("rollback");

    assert!(!store.in_transaction());
    assert_eq!(store.stored_keys(), vec![key]);
    assert_eq!(store.indexed_elements().expect("elements"), Vec::new());
}

#[rstest]
fn commit_keeps_changes(amenity: TagKey) {
    let mut store = MemoryTagIndexStore::new();
    store.begin().expect("begin");
    store.ensure_key(&amenity).expect("create tables");
    store.commit().expect("commit");
    store.rollback().expect("rollback without transaction");
    assert!(store.has_key(&amenity));
}

#[rstest]
fn table_sizes_count_every_table(populated: (MemoryTagIndexStore, TagKey)) {
    let (mut store, key) = populated;
    store
        .set_element_keys(&ElementRef::node(1), std::slice::from_ref(&key))
        .expect("write index");
    let sizes = store.table_sizes().expect("sizes");
    assert_eq!(sizes.get("amenity_pos"), Some(&4));
    assert_eq!(sizes.get("amenity_data"), Some(&4));
    assert_eq!(sizes.get(ELEMENT_INDEX_TABLE), Some(&1));
}
