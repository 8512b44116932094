//! Facade crate for the XAPI tag index.
//!
//! This crate re-exports the engine, its store backends and the element
//! model, with the SQLite backend behind the `store-sqlite` feature.

#![forbid(unsafe_code)]

pub use xapi_index_core::{
    BboxResolver, BoundingBox, Element, ElementChange, ElementKind, ElementRef,
    ElementSetResolver, IndexConfig, IndexError, MemoryTagIndexStore, Member, StoreError, TagKey,
    TagIndexStore, Tags, UpdateStats, XapiIndex, XapiQuery, sanitize_key,
};

#[cfg(feature = "store-sqlite")]
pub use xapi_index_core::SqliteTagIndexStore;
