//! Errors raised by [`TagIndexStore`](super::TagIndexStore) backends.

#[cfg(feature = "store-sqlite")]
use std::path::PathBuf;

use thiserror::Error;

use crate::element::{ElementRef, ParseElementRefError};

/// Failure while reading or writing the index tables.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Opening the SQLite database failed.
    #[cfg(feature = "store-sqlite")]
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A statement against one table failed.
    #[cfg(feature = "store-sqlite")]
    #[error("failed to {operation} on table {table:?}: {source}")]
    Sqlite {
        /// What the store was doing.
        operation: &'static str,
        /// Table the statement addressed.
        table: String,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A record was written for a key whose tables do not exist.
    #[error("table {table:?} does not exist")]
    MissingTable {
        /// Name of the absent table.
        table: String,
    },
    /// The element already has a row in this attribute store.
    #[error("element {element} is already filed in table {table:?}")]
    DuplicateElement {
        /// Attribute store holding the existing row.
        table: String,
        /// Element filed twice.
        element: ElementRef,
    },
    /// The key list of an element index entry could not be encoded.
    #[error("failed to encode key list for {element}: {source}")]
    EncodeKeys {
        /// Element whose entry was being written.
        element: ElementRef,
        /// JSON encoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// A stored key list was not valid JSON.
    #[error("failed to parse key list for {element}: {source}")]
    DecodeKeys {
        /// Element whose entry was read.
        element: ElementRef,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// A stored element reference could not be parsed.
    #[error("table {table:?} holds an invalid element reference: {source}")]
    InvalidElementRef {
        /// Table the reference was read from.
        table: String,
        /// Parse failure.
        #[source]
        source: ParseElementRefError,
    },
    /// A stored type code does not name an element type.
    #[error("table {table:?} holds unknown element type code {code}")]
    UnknownTypeCode {
        /// Table the code was read from.
        table: String,
        /// Offending code.
        code: i64,
    },
    /// A row limit does not fit the storage integer range.
    #[error("row limit {limit} is outside the storage integer range")]
    LimitOutOfRange {
        /// Offending limit.
        limit: usize,
    },
}

#[cfg(feature = "store-sqlite")]
impl StoreError {
    pub(crate) fn sqlite(operation: &'static str, table: &str, source: rusqlite::Error) -> Self {
        Self::Sqlite {
            operation,
            table: table.to_owned(),
            source,
        }
    }
}
