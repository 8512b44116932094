//! In-memory [`TagIndexStore`] backed by one R\*-tree per key.
//!
//! Transactions snapshot the whole state on `begin` and restore it on
//! `rollback`, which gives the same all-or-nothing behaviour as the SQLite
//! backend for datasets small enough to hold in memory.

use std::collections::{BTreeMap, HashMap};

use rstar::{AABB, RTree, RTreeObject};

use super::{
    AttributeRecord, ELEMENT_INDEX_TABLE, IndexRecord, KeyFilter, KeyRows, PositionRecord, RowId,
    StoreError, TableSizes, TagIndexStore,
};
use crate::{bbox::PositionBox, element::ElementRef, schema::SchemaRegistry, schema::TagKey};

#[derive(Debug, Clone, PartialEq)]
struct PositionEntry {
    row_id: RowId,
    position: PositionBox,
}

impl RTreeObject for PositionEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.position.min_lon, self.position.min_lat],
            [self.position.max_lon, self.position.max_lat],
        )
    }
}

#[derive(Debug, Clone)]
struct KeyTables {
    positions: RTree<PositionEntry>,
    positions_by_row: BTreeMap<RowId, PositionBox>,
    attributes: BTreeMap<RowId, AttributeRecord>,
    rows_by_element: HashMap<ElementRef, RowId>,
}

impl Default for KeyTables {
    fn default() -> Self {
        Self {
            positions: RTree::new(),
            positions_by_row: BTreeMap::new(),
            attributes: BTreeMap::new(),
            rows_by_element: HashMap::new(),
        }
    }
}

impl KeyTables {
    fn remove_row(&mut self, row_id: RowId) {
        if let Some(position) = self.positions_by_row.remove(&row_id) {
            self.positions.remove(&PositionEntry { row_id, position });
        }
        if let Some(record) = self.attributes.remove(&row_id) {
            self.rows_by_element.remove(&record.element);
        }
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    registry: SchemaRegistry,
    tables: HashMap<TagKey, KeyTables>,
    element_index: BTreeMap<ElementRef, Vec<TagKey>>,
    last_row_id: RowId,
}

/// Volatile [`TagIndexStore`] for tests, tooling and small extracts.
///
/// # Examples
/// ```
/// use xapi_index_core::{MemoryTagIndexStore, TagIndexStore, TagKey};
///
/// let mut store = MemoryTagIndexStore::new();
/// let key = TagKey::sanitize("amenity");
/// store.ensure_key(&key).expect("create tables");
/// assert!(store.has_key(&key));
/// ```
#[derive(Debug, Default)]
pub struct MemoryTagIndexStore {
    state: MemoryState,
    snapshot: Option<MemoryState>,
}

impl MemoryTagIndexStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a transaction is open.
    #[must_use]
    pub const fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    fn tables_for_insert(&mut self, key: &TagKey) -> Result<&mut KeyTables, StoreError> {
        self.state
            .tables
            .get_mut(key)
            .ok_or_else(|| StoreError::MissingTable {
                table: key.table_names().attribute,
            })
    }
}

impl TagIndexStore for MemoryTagIndexStore {
    fn ensure_key(&mut self, key: &TagKey) -> Result<(), StoreError> {
        if !self.state.registry.has_key(key) {
            self.state.registry.register(key);
            self.state.tables.entry(key.clone()).or_default();
        }
        Ok(())
    }

    fn has_key(&self, key: &TagKey) -> bool {
        self.state.registry.has_key(key)
    }

    fn stored_keys(&self) -> Vec<TagKey> {
        self.state.registry.keys()
    }

    fn insert_record(
        &mut self,
        key: &TagKey,
        record: &IndexRecord<'_>,
    ) -> Result<RowId, StoreError> {
        let row_id = self.state.last_row_id + 1;
        let tables = self.tables_for_insert(key)?;
        if tables.rows_by_element.contains_key(&record.element) {
            return Err(StoreError::DuplicateElement {
                table: key.table_names().attribute,
                element: record.element,
            });
        }

        tables.attributes.insert(
            row_id,
            AttributeRecord {
                row_id,
                element: record.element,
                value: record.value.to_owned(),
                kind: record.element.kind,
                has_nodes: record.has_nodes,
                has_ways: record.has_ways,
            },
        );
        tables.rows_by_element.insert(record.element, row_id);
        tables.positions_by_row.insert(row_id, record.position);
        tables.positions.insert(PositionEntry {
            row_id,
            position: record.position,
        });
        self.state.last_row_id = row_id;
        Ok(row_id)
    }

    fn find_row(&self, key: &TagKey, element: &ElementRef) -> Result<Option<RowId>, StoreError> {
        Ok(self
            .state
            .tables
            .get(key)
            .and_then(|tables| tables.rows_by_element.get(element).copied()))
    }

    fn delete_row(&mut self, key: &TagKey, row_id: RowId) -> Result<(), StoreError> {
        if let Some(tables) = self.state.tables.get_mut(key) {
            tables.remove_row(row_id);
        }
        Ok(())
    }

    fn query_key(
        &self,
        key: &TagKey,
        filter: &KeyFilter<'_>,
    ) -> Result<Vec<ElementRef>, StoreError> {
        let Some(tables) = self.state.tables.get(key) else {
            return Ok(Vec::new());
        };
        let query = filter.bbox;
        if query.to_array().iter().any(|edge| edge.is_nan()) {
            return Ok(Vec::new());
        }

        let envelope =
            AABB::from_corners([query.min_lon, query.min_lat], [query.max_lon, query.max_lat]);
        let mut rows: Vec<RowId> = tables
            .positions
            .locate_in_envelope(&envelope)
            .filter(|entry| entry.position.is_strictly_within(&query))
            .map(|entry| entry.row_id)
            .collect();
        rows.sort_unstable();

        Ok(rows
            .iter()
            .filter_map(|row_id| tables.attributes.get(row_id))
            .filter(|record| filter.accepts(record))
            .take(filter.limit)
            .map(|record| record.element)
            .collect())
    }

    fn key_rows(&self, key: &TagKey) -> Result<KeyRows, StoreError> {
        Ok(self
            .state
            .tables
            .get(key)
            .map(|tables| KeyRows {
                positions: tables
                    .positions_by_row
                    .iter()
                    .map(|(row_id, position)| PositionRecord {
                        row_id: *row_id,
                        position: *position,
                    })
                    .collect(),
                attributes: tables.attributes.values().cloned().collect(),
            })
            .unwrap_or_default())
    }

    fn element_keys(&self, element: &ElementRef) -> Result<Option<Vec<TagKey>>, StoreError> {
        Ok(self.state.element_index.get(element).cloned())
    }

    fn set_element_keys(
        &mut self,
        element: &ElementRef,
        keys: &[TagKey],
    ) -> Result<(), StoreError> {
        self.state.element_index.insert(*element, keys.to_vec());
        Ok(())
    }

    fn remove_element_keys(&mut self, element: &ElementRef) -> Result<(), StoreError> {
        self.state.element_index.remove(element);
        Ok(())
    }

    fn indexed_elements(&self) -> Result<Vec<ElementRef>, StoreError> {
        Ok(self.state.element_index.keys().copied().collect())
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        if self.snapshot.is_none() {
            self.snapshot = Some(self.state.clone());
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.snapshot = None;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        if let Some(snapshot) = self.snapshot.take() {
            self.state = snapshot;
        }
        Ok(())
    }

    fn purge(&mut self) -> Result<(), StoreError> {
        self.state = MemoryState::default();
        Ok(())
    }

    fn table_sizes(&self) -> Result<TableSizes, StoreError> {
        let mut sizes = TableSizes::new();
        for (key, tables) in &self.state.tables {
            let names = key.table_names();
            sizes.insert(names.position, count(tables.positions_by_row.len()));
            sizes.insert(names.attribute, count(tables.attributes.len()));
        }
        sizes.insert(
            ELEMENT_INDEX_TABLE.to_owned(),
            count(self.state.element_index.len()),
        );
        Ok(sizes)
    }
}

fn count(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}
