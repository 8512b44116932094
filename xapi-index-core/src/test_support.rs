//! Fixtures and invariant checks shared by unit, property and behaviour
//! tests. Compiled for `cfg(test)` and behind the `test-support` feature.

use std::collections::{BTreeSet, HashMap};

use geo::Coord;

use crate::{
    bbox::BoundingBox,
    element::{Element, ElementRef, Tags},
    resolver::{BboxResolver, ResolveBboxError},
    schema::TagKey,
    store::{StoreError, TagIndexStore},
};

/// Resolver answering from a fixed table of bboxes.
///
/// Unknown elements resolve to `None`.
#[derive(Debug, Clone, Default)]
pub struct FixedBboxResolver {
    boxes: HashMap<ElementRef, BoundingBox>,
}

impl FixedBboxResolver {
    /// Add or replace the bbox of `element`.
    #[must_use]
    pub fn with(mut self, element: ElementRef, bbox: BoundingBox) -> Self {
        self.boxes.insert(element, bbox);
        self
    }

    /// Add or replace the bbox of `element` in place.
    pub fn set(&mut self, element: ElementRef, bbox: BoundingBox) {
        self.boxes.insert(element, bbox);
    }
}

impl BboxResolver for FixedBboxResolver {
    fn resolve_bbox(&self, element: &ElementRef) -> Result<Option<BoundingBox>, ResolveBboxError> {
        Ok(self.boxes.get(element).copied())
    }
}

/// Resolver that fails every lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingBboxResolver;

impl BboxResolver for FailingBboxResolver {
    fn resolve_bbox(&self, element: &ElementRef) -> Result<Option<BoundingBox>, ResolveBboxError> {
        Err(ResolveBboxError {
            element: *element,
            message: "geometry service unavailable".into(),
        })
    }
}

/// Build tags from string pairs.
#[must_use]
pub fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
}

/// A tagged node at `(lon, lat)`.
#[must_use]
pub fn node(id: i64, lon: f64, lat: f64, pairs: &[(&str, &str)]) -> Element {
    Element::node(id, Coord { x: lon, y: lat }, tags(pairs))
}

/// Describe every key whose position and attribute row ids differ.
///
/// # Errors
/// Propagates store failures.
pub fn pairing_violations<S>(store: &S) -> Result<Vec<String>, StoreError>
where
    S: TagIndexStore + ?Sized,
{
    let mut violations = Vec::new();
    for key in store.stored_keys() {
        let rows = store.key_rows(&key)?;
        let positions: BTreeSet<_> = rows.positions.iter().map(|row| row.row_id).collect();
        let attributes: BTreeSet<_> = rows.attributes.iter().map(|row| row.row_id).collect();
        if positions != attributes {
            violations.push(format!(
                "{key}: position rows {positions:?} != attribute rows {attributes:?}"
            ));
        }
    }
    Ok(violations)
}

/// Keys whose attribute store holds a row for `element`.
///
/// # Errors
/// Propagates store failures.
pub fn keys_holding<S>(store: &S, element: &ElementRef) -> Result<BTreeSet<TagKey>, StoreError>
where
    S: TagIndexStore + ?Sized,
{
    let mut keys = BTreeSet::new();
    for key in store.stored_keys() {
        if store.find_row(&key, element)?.is_some() {
            keys.insert(key);
        }
    }
    Ok(keys)
}

/// Describe every element whose rows disagree with its element index entry.
///
/// Elements that appear only in attribute stores are reported too.
///
/// # Errors
/// Propagates store failures.
pub fn coverage_violations<S>(store: &S) -> Result<Vec<String>, StoreError>
where
    S: TagIndexStore + ?Sized,
{
    let mut elements: BTreeSet<ElementRef> = store.indexed_elements()?.into_iter().collect();
    for key in store.stored_keys() {
        elements.extend(store.key_rows(&key)?.attributes.iter().map(|row| row.element));
    }

    let mut violations = Vec::new();
    for element in elements {
        let listed: BTreeSet<TagKey> = store
            .element_keys(&element)?
            .unwrap_or_default()
            .into_iter()
            .collect();
        let holding = keys_holding(store, &element)?;
        if listed != holding {
            violations.push(format!(
                "{element}: indexed under {listed:?} but filed in {holding:?}"
            ));
        }
    }
    Ok(violations)
}
