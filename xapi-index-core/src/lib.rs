//! Spatial tag index behind XAPI-style map queries.
//!
//! The index files every tagged element under each of its tag keys. Per key
//! it keeps a position index of bounding boxes and an attribute store of
//! element references, values and type codes, paired by row id. A reverse
//! element index records which keys each element is filed under so that an
//! update can remove stale rows before inserting fresh ones.
//!
//! [`XapiIndex`] is the entry point: it owns a [`TagIndexStore`] and a
//! [`BboxResolver`], buffers updates and answers [`XapiQuery`] lookups.
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod bbox;
pub mod config;
pub mod element;
pub mod error;
pub mod index;
pub mod query;
pub mod resolver;
pub mod schema;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use bbox::{BoundingBox, PositionBox};
pub use config::{DEFAULT_MAX_RECORDS, IndexConfig};
pub use element::{
    Element, ElementChange, ElementKind, ElementRef, Member, ParseElementRefError, Tags,
    UnknownElementType,
};
pub use error::IndexError;
pub use index::{UpdateStats, XapiIndex};
pub use query::{XapiQuery, query_xapi, query_xapi_single};
pub use resolver::{BboxResolver, ElementSetResolver, ResolveBboxError};
pub use schema::{SchemaRegistry, TagKey, sanitize_key};
#[cfg(feature = "store-sqlite")]
pub use store::SqliteTagIndexStore;
pub use store::{
    AttributeRecord, IndexRecord, KeyFilter, KeyRows, MemoryTagIndexStore, PositionRecord, RowId,
    StoreError, TableSizes, TagIndexStore,
};
