//! XAPI-style queries: bbox plus tag key, value and element type filters.
//!
//! Keys and values accept `|`-separated alternatives. Each key alternative is
//! evaluated on its own and the results are merged in order, dropping
//! elements already seen. Merging stops as soon as the accumulated result
//! exceeds the record cap, so a multi-key query may return more than
//! `max_records` elements while a single key never does. A query without
//! its own cap takes the engine's configured one, or [`DEFAULT_MAX_RECORDS`]
//! when evaluated directly against a store.

use std::collections::HashSet;

use crate::{
    bbox::BoundingBox,
    config::DEFAULT_MAX_RECORDS,
    element::{ElementKind, ElementRef},
    error::IndexError,
    schema::TagKey,
    store::{KeyFilter, TagIndexStore},
};

/// Separator for key and value alternatives.
pub const ALTERNATION: char = '|';

/// A query against the tag index.
///
/// # Examples
/// ```
/// use xapi_index_core::{BoundingBox, ElementKind, XapiQuery};
///
/// let query = XapiQuery::new("amenity|shop")
///     .with_value("cafe")
///     .with_kind(ElementKind::Node)
///     .with_bbox(BoundingBox::new(0.0, 0.0, 20.0, 20.0));
/// assert_eq!(query.key_alternatives().collect::<Vec<_>>(), vec!["amenity", "shop"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct XapiQuery {
    /// Restrict results to one element type.
    pub kind: Option<ElementKind>,
    /// Search area; the whole world when `None`.
    pub bbox: Option<BoundingBox>,
    /// Tag key, possibly `|`-separated.
    pub key: String,
    /// Tag value, possibly `|`-separated; any value when `None`.
    pub value: Option<String>,
    /// Result cap; the evaluating engine's cap when `None`.
    pub max_records: Option<usize>,
}

impl XapiQuery {
    /// Query every element carrying `key`.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            kind: None,
            bbox: None,
            key: key.into(),
            value: None,
            max_records: None,
        }
    }

    /// Restrict to one element type.
    #[must_use]
    pub const fn with_kind(mut self, kind: ElementKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restrict to elements strictly inside `bbox`.
    #[must_use]
    pub const fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Restrict to the given value alternatives.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set an explicit result cap.
    #[must_use]
    pub const fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = Some(max_records);
        self
    }

    /// The cap in force, falling back to [`DEFAULT_MAX_RECORDS`].
    #[must_use]
    pub const fn record_limit(&self) -> usize {
        match self.max_records {
            Some(limit) => limit,
            None => DEFAULT_MAX_RECORDS,
        }
    }

    /// Key alternatives in the order given.
    pub fn key_alternatives(&self) -> impl Iterator<Item = &str> {
        self.key.split(ALTERNATION)
    }

    /// Value alternatives; empty when no value filter is set.
    #[must_use]
    pub fn value_alternatives(&self) -> Vec<&str> {
        self.value
            .as_deref()
            .map(|value| value.split(ALTERNATION).collect())
            .unwrap_or_default()
    }
}

/// Evaluate `query` against `store`.
///
/// # Errors
/// Returns [`IndexError::EmptyKey`] for an empty key and propagates store
/// failures.
pub fn query_xapi<S>(store: &S, query: &XapiQuery) -> Result<Vec<ElementRef>, IndexError>
where
    S: TagIndexStore + ?Sized,
{
    if query.key.is_empty() {
        return Err(IndexError::EmptyKey);
    }

    let limit = query.record_limit();
    let values = query.value_alternatives();
    let mut seen = HashSet::new();
    let mut results = Vec::new();
    for key in query.key_alternatives() {
        let found = query_xapi_single(store, query, key, &values)?;
        results.extend(found.into_iter().filter(|element| seen.insert(*element)));
        if results.len() > limit {
            return Ok(results);
        }
    }
    Ok(results)
}

/// Evaluate one key alternative of `query`.
///
/// A key without tables yields an empty result.
///
/// # Errors
/// Propagates store failures.
pub fn query_xapi_single<S>(
    store: &S,
    query: &XapiQuery,
    key: &str,
    values: &[&str],
) -> Result<Vec<ElementRef>, IndexError>
where
    S: TagIndexStore + ?Sized,
{
    let tag_key = TagKey::sanitize(key);
    if !store.has_key(&tag_key) {
        log::debug!("no tables for key {tag_key}");
        return Ok(Vec::new());
    }

    let filter = KeyFilter {
        bbox: query.bbox.unwrap_or(BoundingBox::WORLD),
        values: values.to_vec(),
        kind: query.kind,
        limit: query.record_limit(),
    };
    Ok(store.query_key(&tag_key, &filter)?)
}
