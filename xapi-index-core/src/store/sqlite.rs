//! SQLite-backed [`TagIndexStore`].
//!
//! Each key owns an R\*Tree virtual table `"<key>_pos"` with columns
//! `(id, min_lat, max_lat, min_lon, max_lon)` and an ordinary table
//! `"<key>_data"` keyed by the same row id. The element index lives in
//! [`ELEMENT_INDEX_TABLE`] as a JSON array of keys per element.
//!
//! SQLite's R\*Tree stores coordinates as 32-bit floats, so positions read
//! back through [`TagIndexStore::key_rows`] may be rounded by up to one
//! float32 ulp. Containment tests run against the rounded values.

use std::{fmt, path::Path};

use rusqlite::{Connection, OptionalExtension, Params, Row, params_from_iter, types::Value};

use super::{
    AttributeRecord, ELEMENT_INDEX_TABLE, IndexRecord, KeyFilter, KeyRows, PositionRecord, RowId,
    StoreError, TableSizes, TagIndexStore,
};
use crate::{
    bbox::PositionBox,
    element::{ElementKind, ElementRef},
    schema::{SchemaRegistry, TagKey},
};

/// Persistent [`TagIndexStore`] over a single SQLite database.
pub struct SqliteTagIndexStore {
    connection: Connection,
    registry: SchemaRegistry,
}

impl fmt::Debug for SqliteTagIndexStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteTagIndexStore")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl SqliteTagIndexStore {
    /// Open or create the database at `path`.
    ///
    /// # Errors
    /// Returns [`StoreError::OpenDatabase`] when SQLite cannot open the file
    /// and [`StoreError::Sqlite`] when the element index cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let database_path = path.as_ref();
        let connection =
            Connection::open(database_path).map_err(|source| StoreError::OpenDatabase {
                path: database_path.to_path_buf(),
                source,
            })?;
        Self::from_connection(connection)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Same as [`SqliteTagIndexStore::open`].
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let connection =
            Connection::open_in_memory().map_err(|source| StoreError::OpenDatabase {
                path: ":memory:".into(),
                source,
            })?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self, StoreError> {
        let mut store = Self {
            connection,
            registry: SchemaRegistry::default(),
        };
        store.create_element_index()?;
        store.refresh_registry()?;
        log::debug!(
            "opened SQLite tag index with {} keys",
            store.registry.keys().len()
        );
        Ok(store)
    }

    /// Whether a write transaction is open on the connection.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        !self.connection.is_autocommit()
    }

    fn create_element_index(&self) -> Result<(), StoreError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                element_id TEXT PRIMARY KEY NOT NULL,
                tag_keys TEXT NOT NULL
            )",
            quote_identifier(ELEMENT_INDEX_TABLE)
        );
        self.run_batch(&sql, "create element index", ELEMENT_INDEX_TABLE)
    }

    fn refresh_registry(&mut self) -> Result<(), StoreError> {
        let names: Vec<String> = collect_rows(
            &self.connection,
            "SELECT name FROM sqlite_master WHERE type = 'table'",
            [],
            |row| row.get(0),
        )
        .map_err(|source| StoreError::sqlite("list tables", "sqlite_master", source))?;
        self.registry = SchemaRegistry::from_tables(names);
        Ok(())
    }

    fn run_batch(&self, sql: &str, operation: &'static str, table: &str) -> Result<(), StoreError> {
        self.connection
            .execute_batch(sql)
            .map_err(|source| StoreError::sqlite(operation, table, source))
    }
}

impl TagIndexStore for SqliteTagIndexStore {
    fn ensure_key(&mut self, key: &TagKey) -> Result<(), StoreError> {
        let names = key.table_names();
        let mut created = false;

        if !self.registry.contains_table(&names.position) {
            let sql = format!(
                "CREATE VIRTUAL TABLE IF NOT EXISTS {} USING rtree(
                    id,
                    min_lat, max_lat,
                    min_lon, max_lon
                )",
                quote_identifier(&names.position)
            );
            self.run_batch(&sql, "create position index", &names.position)?;
            created = true;
        }

        if !self.registry.contains_table(&names.attribute) {
            let sql = format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    row_id INTEGER PRIMARY KEY,
                    element_id TEXT NOT NULL UNIQUE,
                    value TEXT NOT NULL,
                    type_code INTEGER NOT NULL,
                    has_nodes INTEGER NOT NULL,
                    has_ways INTEGER NOT NULL
                )",
                quote_identifier(&names.attribute)
            );
            self.run_batch(&sql, "create attribute store", &names.attribute)?;
            created = true;
        }

        if created {
            log::debug!("created tables for key {key}");
            self.refresh_registry()?;
        }
        Ok(())
    }

    fn has_key(&self, key: &TagKey) -> bool {
        self.registry.has_key(key)
    }

    fn stored_keys(&self) -> Vec<TagKey> {
        self.registry.keys()
    }

    fn insert_record(
        &mut self,
        key: &TagKey,
        record: &IndexRecord<'_>,
    ) -> Result<RowId, StoreError> {
        let names = key.table_names();
        let attribute_sql = format!(
            "INSERT INTO {} (element_id, value, type_code, has_nodes, has_ways)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            quote_identifier(&names.attribute)
        );
        self.connection
            .prepare_cached(&attribute_sql)
            .and_then(|mut statement| {
                statement.execute((
                    record.element.to_string(),
                    record.value,
                    record.element.kind.type_code(),
                    record.has_nodes,
                    record.has_ways,
                ))
            })
            .map_err(|source| StoreError::sqlite("insert attribute row", &names.attribute, source))?;
        let row_id = self.connection.last_insert_rowid();

        let position_sql = format!(
            "INSERT INTO {} (id, min_lat, max_lat, min_lon, max_lon) VALUES (?1, ?2, ?3, ?4, ?5)",
            quote_identifier(&names.position)
        );
        let position = record.position;
        self.connection
            .prepare_cached(&position_sql)
            .and_then(|mut statement| {
                statement.execute((
                    row_id,
                    position.min_lat,
                    position.max_lat,
                    position.min_lon,
                    position.max_lon,
                ))
            })
            .map_err(|source| StoreError::sqlite("insert position row", &names.position, source))?;
        Ok(row_id)
    }

    fn find_row(&self, key: &TagKey, element: &ElementRef) -> Result<Option<RowId>, StoreError> {
        let table = key.table_names().attribute;
        let sql = format!(
            "SELECT row_id FROM {} WHERE element_id = ?1",
            quote_identifier(&table)
        );
        self.connection
            .prepare_cached(&sql)
            .and_then(|mut statement| {
                statement
                    .query_row([element.to_string()], |row| row.get(0))
                    .optional()
            })
            .map_err(|source| StoreError::sqlite("look up element row", &table, source))
    }

    fn delete_row(&mut self, key: &TagKey, row_id: RowId) -> Result<(), StoreError> {
        let names = key.table_names();
        for (table, column, operation) in [
            (&names.position, "id", "delete position row"),
            (&names.attribute, "row_id", "delete attribute row"),
        ] {
            let sql = format!(
                "DELETE FROM {} WHERE {column} = ?1",
                quote_identifier(table)
            );
            self.connection
                .prepare_cached(&sql)
                .and_then(|mut statement| statement.execute([row_id]))
                .map_err(|source| StoreError::sqlite(operation, table, source))?;
        }
        Ok(())
    }

    fn query_key(
        &self,
        key: &TagKey,
        filter: &KeyFilter<'_>,
    ) -> Result<Vec<ElementRef>, StoreError> {
        let names = key.table_names();
        let limit = i64::try_from(filter.limit).map_err(|_| StoreError::LimitOutOfRange {
            limit: filter.limit,
        })?;
        let bbox = filter.bbox;
        let mut sql = format!(
            "SELECT d.element_id FROM {} AS p INNER JOIN {} AS d ON d.row_id = p.id
             WHERE p.min_lat > ?1 AND p.max_lat < ?2 AND p.max_lon < ?3 AND p.min_lon > ?4",
            quote_identifier(&names.position),
            quote_identifier(&names.attribute)
        );
        let mut params = vec![
            Value::Real(bbox.min_lat),
            Value::Real(bbox.max_lat),
            Value::Real(bbox.max_lon),
            Value::Real(bbox.min_lon),
        ];

        if !filter.values.is_empty() {
            let mut alternatives = Vec::with_capacity(filter.values.len());
            for value in &filter.values {
                params.push(Value::Text((*value).to_owned()));
                alternatives.push(format!("d.value = ?{}", params.len()));
            }
            sql.push_str(&format!(" AND ({})", alternatives.join(" OR ")));
        }
        if let Some(kind) = filter.kind {
            params.push(Value::Integer(kind.type_code()));
            sql.push_str(&format!(" AND d.type_code = ?{}", params.len()));
        }
        params.push(Value::Integer(limit));
        sql.push_str(&format!(" ORDER BY d.row_id LIMIT ?{}", params.len()));

        let raw: Vec<String> =
            collect_rows(&self.connection, &sql, params_from_iter(params.iter()), |row| {
                row.get(0)
            })
            .map_err(|source| StoreError::sqlite("query key", &names.attribute, source))?;

        raw.iter()
            .map(|value| parse_element(value, &names.attribute))
            .collect()
    }

    fn key_rows(&self, key: &TagKey) -> Result<KeyRows, StoreError> {
        let names = key.table_names();
        let position_sql = format!(
            "SELECT id, min_lat, max_lat, min_lon, max_lon FROM {} ORDER BY id",
            quote_identifier(&names.position)
        );
        let positions = collect_rows(&self.connection, &position_sql, [], |row| {
            Ok(PositionRecord {
                row_id: row.get(0)?,
                position: PositionBox {
                    min_lat: row.get(1)?,
                    max_lat: row.get(2)?,
                    min_lon: row.get(3)?,
                    max_lon: row.get(4)?,
                },
            })
        })
        .map_err(|source| StoreError::sqlite("read position index", &names.position, source))?;

        let attribute_sql = format!(
            "SELECT row_id, element_id, value, type_code, has_nodes, has_ways
             FROM {} ORDER BY row_id",
            quote_identifier(&names.attribute)
        );
        let rows = collect_rows(&self.connection, &attribute_sql, [], |row| {
            Ok(RawAttributeRow {
                row_id: row.get(0)?,
                element_id: row.get(1)?,
                value: row.get(2)?,
                type_code: row.get(3)?,
                has_nodes: row.get(4)?,
                has_ways: row.get(5)?,
            })
        })
        .map_err(|source| StoreError::sqlite("read attribute store", &names.attribute, source))?;

        let attributes = rows
            .into_iter()
            .map(|row| row.into_record(&names.attribute))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(KeyRows {
            positions,
            attributes,
        })
    }

    fn element_keys(&self, element: &ElementRef) -> Result<Option<Vec<TagKey>>, StoreError> {
        let sql = format!(
            "SELECT tag_keys FROM {} WHERE element_id = ?1",
            quote_identifier(ELEMENT_INDEX_TABLE)
        );
        let stored: Option<String> = self
            .connection
            .prepare_cached(&sql)
            .and_then(|mut statement| {
                statement
                    .query_row([element.to_string()], |row| row.get(0))
                    .optional()
            })
            .map_err(|source| StoreError::sqlite("read element index", ELEMENT_INDEX_TABLE, source))?;

        stored
            .map(|json| {
                serde_json::from_str(&json).map_err(|source| StoreError::DecodeKeys {
                    element: *element,
                    source,
                })
            })
            .transpose()
    }

    fn set_element_keys(
        &mut self,
        element: &ElementRef,
        keys: &[TagKey],
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(keys).map_err(|source| StoreError::EncodeKeys {
            element: *element,
            source,
        })?;
        let sql = format!(
            "INSERT OR REPLACE INTO {} (element_id, tag_keys) VALUES (?1, ?2)",
            quote_identifier(ELEMENT_INDEX_TABLE)
        );
        self.connection
            .prepare_cached(&sql)
            .and_then(|mut statement| statement.execute((element.to_string(), json)))
            .map_err(|source| {
                StoreError::sqlite("write element index", ELEMENT_INDEX_TABLE, source)
            })?;
        Ok(())
    }

    fn remove_element_keys(&mut self, element: &ElementRef) -> Result<(), StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE element_id = ?1",
            quote_identifier(ELEMENT_INDEX_TABLE)
        );
        self.connection
            .prepare_cached(&sql)
            .and_then(|mut statement| statement.execute([element.to_string()]))
            .map_err(|source| {
                StoreError::sqlite("delete element index entry", ELEMENT_INDEX_TABLE, source)
            })?;
        Ok(())
    }

    fn indexed_elements(&self) -> Result<Vec<ElementRef>, StoreError> {
        let sql = format!(
            "SELECT element_id FROM {}",
            quote_identifier(ELEMENT_INDEX_TABLE)
        );
        let raw: Vec<String> = collect_rows(&self.connection, &sql, [], |row| row.get(0))
            .map_err(|source| StoreError::sqlite("read element index", ELEMENT_INDEX_TABLE, source))?;

        let mut elements = raw
            .iter()
            .map(|value| parse_element(value, ELEMENT_INDEX_TABLE))
            .collect::<Result<Vec<_>, _>>()?;
        elements.sort_unstable();
        Ok(elements)
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        if self.connection.is_autocommit() {
            self.run_batch("BEGIN", "begin transaction", "main")?;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if !self.connection.is_autocommit() {
            self.run_batch("COMMIT", "commit transaction", "main")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        if !self.connection.is_autocommit() {
            self.run_batch("ROLLBACK", "roll back transaction", "main")?;
        }
        self.refresh_registry()
    }

    fn purge(&mut self) -> Result<(), StoreError> {
        let tables: Vec<String> = self.registry.tables().map(str::to_owned).collect();
        for table in &tables {
            let sql = format!("DROP TABLE IF EXISTS {}", quote_identifier(table));
            self.run_batch(&sql, "drop table", table)?;
        }
        log::info!("dropped {} tables", tables.len());
        self.create_element_index()?;
        self.refresh_registry()
    }

    fn table_sizes(&self) -> Result<TableSizes, StoreError> {
        let mut sizes = TableSizes::new();
        for table in self.registry.tables() {
            let sql = format!("SELECT count(*) FROM {}", quote_identifier(table));
            let rows: i64 = self
                .connection
                .query_row(&sql, [], |row| row.get(0))
                .map_err(|source| StoreError::sqlite("count rows", table, source))?;
            sizes.insert(table.to_owned(), rows.unsigned_abs());
        }
        Ok(sizes)
    }
}

struct RawAttributeRow {
    row_id: RowId,
    element_id: String,
    value: String,
    type_code: i64,
    has_nodes: bool,
    has_ways: bool,
}

impl RawAttributeRow {
    fn into_record(self, table: &str) -> Result<AttributeRecord, StoreError> {
        let kind =
            ElementKind::from_type_code(self.type_code).ok_or_else(|| {
                StoreError::UnknownTypeCode {
                    table: table.to_owned(),
                    code: self.type_code,
                }
            })?;
        Ok(AttributeRecord {
            row_id: self.row_id,
            element: parse_element(&self.element_id, table)?,
            value: self.value,
            kind,
            has_nodes: self.has_nodes,
            has_ways: self.has_ways,
        })
    }
}

fn parse_element(value: &str, table: &str) -> Result<ElementRef, StoreError> {
    value
        .parse()
        .map_err(|source| StoreError::InvalidElementRef {
            table: table.to_owned(),
            source,
        })
}

fn collect_rows<T, P, F>(connection: &Connection, sql: &str, params: P, map: F) -> rusqlite::Result<Vec<T>>
where
    P: Params,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut statement = connection.prepare_cached(sql)?;
    let rows = statement.query_map(params, map)?;
    rows.collect()
}

/// Quote an identifier for interpolation into SQL.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
