//! Storage backends for the per-key position/attribute tables and the
//! element index.
//!
//! The [`TagIndexStore`] trait is the seam between the update/query protocol
//! and the storage engine. Its record-level operations always touch the
//! position index and the attribute store of a key together, so the two can
//! never drift apart: every row id present in one is present in the other.

use std::collections::BTreeMap;

use crate::{
    bbox::{BoundingBox, PositionBox},
    element::{ElementKind, ElementRef},
    schema::TagKey,
};

mod error;
mod memory;
#[cfg(feature = "store-sqlite")]
mod sqlite;

pub use error::StoreError;
pub use memory::MemoryTagIndexStore;
#[cfg(feature = "store-sqlite")]
pub use sqlite::SqliteTagIndexStore;

/// Name of the table mapping element references to the keys they are filed
/// under.
pub const ELEMENT_INDEX_TABLE: &str = "element_index";

/// Synthetic identifier pairing a position record with its attribute record.
pub type RowId = i64;

/// Row counts keyed by table name.
pub type TableSizes = BTreeMap<String, u64>;

/// Values written for one (tag key, element) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexRecord<'a> {
    /// Element being filed.
    pub element: ElementRef,
    /// Tag value under this key.
    pub value: &'a str,
    /// Whether the element has node members.
    pub has_nodes: bool,
    /// Whether the element has way members.
    pub has_ways: bool,
    /// Resolved bbox in stored order.
    pub position: PositionBox,
}

/// A row of a position index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionRecord {
    /// Row id shared with the attribute record.
    pub row_id: RowId,
    /// Stored bbox.
    pub position: PositionBox,
}

/// A row of an attribute store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRecord {
    /// Row id shared with the position record.
    pub row_id: RowId,
    /// Filed element; unique within one attribute store.
    pub element: ElementRef,
    /// Tag value.
    pub value: String,
    /// Element type, persisted as its type code.
    pub kind: ElementKind,
    /// Whether the element has node members.
    pub has_nodes: bool,
    /// Whether the element has way members.
    pub has_ways: bool,
}

/// Full contents of one key's table pair, each list ordered by row id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyRows {
    /// Position index rows.
    pub positions: Vec<PositionRecord>,
    /// Attribute store rows.
    pub attributes: Vec<AttributeRecord>,
}

/// Conditions applied to one key's tables by [`TagIndexStore::query_key`].
#[derive(Debug, Clone, PartialEq)]
pub struct KeyFilter<'a> {
    /// Stored bboxes must lie strictly inside this box.
    pub bbox: BoundingBox,
    /// Accepted values; empty accepts any value.
    pub values: Vec<&'a str>,
    /// Accepted element type; `None` accepts all.
    pub kind: Option<ElementKind>,
    /// Maximum number of rows returned.
    pub limit: usize,
}

impl KeyFilter<'_> {
    /// Whether an attribute row passes the value and type conditions.
    #[must_use]
    pub fn accepts(&self, record: &AttributeRecord) -> bool {
        let value_matches =
            self.values.is_empty() || self.values.iter().any(|value| *value == record.value);
        let kind_matches = self.kind.is_none_or(|kind| kind == record.kind);
        value_matches && kind_matches
    }
}

/// Storage for per-key table pairs, the element index and write sessions.
///
/// Implementations must keep the position index and attribute store of each
/// key paired: [`insert_record`](Self::insert_record) and
/// [`delete_row`](Self::delete_row) act on both tables or fail.
pub trait TagIndexStore {
    /// Create the table pair for `key` unless it already exists.
    fn ensure_key(&mut self, key: &TagKey) -> Result<(), StoreError>;

    /// Whether a table pair exists for `key`.
    fn has_key(&self, key: &TagKey) -> bool;

    /// Every key with a table pair.
    fn stored_keys(&self) -> Vec<TagKey>;

    /// Insert an attribute row and its position row under a fresh row id.
    fn insert_record(&mut self, key: &TagKey, record: &IndexRecord<'_>)
    -> Result<RowId, StoreError>;

    /// Row id of `element` in the attribute store of `key`, if any.
    fn find_row(&self, key: &TagKey, element: &ElementRef) -> Result<Option<RowId>, StoreError>;

    /// Delete `row_id` from both tables of `key`. Missing rows are ignored.
    fn delete_row(&mut self, key: &TagKey, row_id: RowId) -> Result<(), StoreError>;

    /// Elements in `key` matching `filter`, ordered by row id.
    fn query_key(&self, key: &TagKey, filter: &KeyFilter<'_>)
    -> Result<Vec<ElementRef>, StoreError>;

    /// Both tables of `key`, for inspection.
    fn key_rows(&self, key: &TagKey) -> Result<KeyRows, StoreError>;

    /// Keys `element` is currently filed under.
    fn element_keys(&self, element: &ElementRef) -> Result<Option<Vec<TagKey>>, StoreError>;

    /// Replace the element index entry of `element`.
    fn set_element_keys(&mut self, element: &ElementRef, keys: &[TagKey])
    -> Result<(), StoreError>;

    /// Delete the element index entry of `element`, if present.
    fn remove_element_keys(&mut self, element: &ElementRef) -> Result<(), StoreError>;

    /// Every element with an element index entry.
    fn indexed_elements(&self) -> Result<Vec<ElementRef>, StoreError>;

    /// Open a write transaction unless one is already open.
    fn begin(&mut self) -> Result<(), StoreError>;

    /// Commit the open transaction, if any.
    fn commit(&mut self) -> Result<(), StoreError>;

    /// Discard the open transaction, if any.
    fn rollback(&mut self) -> Result<(), StoreError>;

    /// Drop every table pair and the element index.
    fn purge(&mut self) -> Result<(), StoreError>;

    /// Row counts of every table.
    fn table_sizes(&self) -> Result<TableSizes, StoreError>;
}

#[cfg(test)]
mod tests;
