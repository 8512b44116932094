//! The owned index engine.
//!
//! [`XapiIndex`] ties a [`TagIndexStore`] to a [`BboxResolver`], buffers
//! element updates and runs all writes inside one long-lived session. The
//! session opens with the first write and stays open until [`XapiIndex::commit`],
//! [`XapiIndex::rollback`] or [`XapiIndex::close`]. Dropping the engine flushes
//! and commits whatever is still pending.

use std::time::Instant;

use crate::{
    config::IndexConfig,
    element::{Element, ElementChange, ElementRef},
    error::IndexError,
    query::{XapiQuery, query_xapi},
    resolver::BboxResolver,
    schema::TagKey,
    store::{TableSizes, TagIndexStore},
};

mod buffer;
mod protocol;
mod session;

use buffer::UpdateBuffer;
use session::WriteSession;

/// Counters reported by [`XapiIndex::update`] and [`XapiIndex::flush`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// Elements processed.
    pub elements: usize,
    /// (key, element) rows inserted.
    pub inserts: usize,
}

/// Spatial tag index over a store and a bbox resolver.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use xapi_index_core::{
///     BoundingBox, Element, ElementKind, ElementRef, ElementSetResolver,
///     MemoryTagIndexStore, Tags, XapiIndex, XapiQuery,
/// };
///
/// let mut index = XapiIndex::new(MemoryTagIndexStore::new(), ElementSetResolver::default());
/// let cafe = Element::node(
///     1,
///     Coord { x: 10.0, y: 10.0 },
///     Tags::from([("amenity".into(), "cafe".into())]),
/// );
/// index.add_elements_to_buffer([cafe]).expect("buffer");
/// index.flush().expect("flush");
///
/// let query = XapiQuery::new("amenity")
///     .with_value("cafe")
///     .with_kind(ElementKind::Node)
///     .with_bbox(BoundingBox::new(0.0, 0.0, 20.0, 20.0));
/// assert_eq!(index.query(&query).expect("query"), vec![ElementRef::node(1)]);
/// index.close().expect("close");
/// ```
#[derive(Debug)]
pub struct XapiIndex<S, R>
where
    S: TagIndexStore,
    R: BboxResolver,
{
    store: S,
    resolver: R,
    config: IndexConfig,
    session: WriteSession,
    buffer: UpdateBuffer,
    closed: bool,
}

impl<S, R> XapiIndex<S, R>
where
    S: TagIndexStore,
    R: BboxResolver,
{
    /// Engine with the default configuration.
    #[must_use]
    pub fn new(store: S, resolver: R) -> Self {
        Self::with_config(store, resolver, IndexConfig::default())
    }

    /// Engine with an explicit configuration.
    #[must_use]
    pub fn with_config(store: S, resolver: R, config: IndexConfig) -> Self {
        Self {
            store,
            resolver,
            config,
            session: WriteSession::default(),
            buffer: UpdateBuffer::default(),
            closed: false,
        }
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The bbox resolver.
    #[must_use]
    pub const fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Mutable access to the bbox resolver, for feeding it new elements.
    pub const fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Elements waiting for a flush.
    #[must_use]
    pub const fn pending(&self) -> &[Element] {
        self.buffer.as_slice()
    }

    /// Whether a write session is open.
    #[must_use]
    pub const fn in_session(&self) -> bool {
        self.session.is_open()
    }

    /// Remove `element` from every key it is filed under.
    ///
    /// Removing an element that is not indexed does nothing.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn remove_element(&mut self, element: &ElementRef) -> Result<(), IndexError> {
        self.session.ensure_open(&mut self.store)?;
        protocol::remove_element(&mut self.store, element)
    }

    /// Re-index `elements` immediately, bypassing the buffer.
    ///
    /// Each element is removed first and then filed under its current tags;
    /// an element without tags is only removed.
    ///
    /// # Errors
    /// Stops at the first element that fails. Earlier elements of the batch
    /// stay applied inside the open session.
    pub fn update(&mut self, elements: &[Element]) -> Result<UpdateStats, IndexError> {
        let started = Instant::now();
        self.session.ensure_open(&mut self.store)?;
        let mut stats = UpdateStats::default();
        for element in elements {
            stats.inserts += protocol::apply_update(&mut self.store, &self.resolver, element)?;
            stats.elements += 1;
        }
        log::debug!(
            "updated {} elements with {} inserts in {:?}",
            stats.elements,
            stats.inserts,
            started.elapsed()
        );
        Ok(stats)
    }

    /// Queue `elements`, flushing once more than `max_records` are pending.
    ///
    /// Returns the flush statistics when a flush ran.
    ///
    /// # Errors
    /// Propagates failures of the automatic flush.
    pub fn add_elements_to_buffer<I>(
        &mut self,
        elements: I,
    ) -> Result<Option<UpdateStats>, IndexError>
    where
        I: IntoIterator<Item = Element>,
    {
        self.buffer.extend(elements);
        if self.buffer.exceeds(self.config.max_records) {
            return self.flush().map(Some);
        }
        Ok(None)
    }

    /// Buffer a changed element and then the parents that depend on it.
    ///
    /// # Errors
    /// Propagates failures of an automatic flush.
    pub fn handle_element_change(&mut self, change: ElementChange) -> Result<(), IndexError> {
        let ElementChange { element, parents } = change;
        self.add_elements_to_buffer([element])?;
        self.add_elements_to_buffer(parents)?;
        Ok(())
    }

    /// Apply and clear the buffer.
    ///
    /// # Errors
    /// On failure the buffer keeps every element, so a later flush retries
    /// the whole batch.
    pub fn flush(&mut self) -> Result<UpdateStats, IndexError> {
        if self.buffer.is_empty() {
            return Ok(UpdateStats::default());
        }
        let batch = self.buffer.take();
        match self.update(&batch) {
            Ok(stats) => Ok(stats),
            Err(err) => {
                self.buffer.restore(batch);
                Err(err)
            }
        }
    }

    /// Evaluate an XAPI query. Buffered elements are not visible.
    ///
    /// A query without its own cap is limited to the configured
    /// `max_records`.
    ///
    /// # Errors
    /// See [`query_xapi`].
    pub fn query(&self, query: &XapiQuery) -> Result<Vec<ElementRef>, IndexError> {
        if query.max_records.is_some() {
            return query_xapi(&self.store, query);
        }
        let capped = query.clone().with_max_records(self.config.max_records);
        query_xapi(&self.store, &capped)
    }

    /// Every key with tables.
    #[must_use]
    pub fn stored_keys(&self) -> Vec<TagKey> {
        self.store.stored_keys()
    }

    /// Row counts of every table.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn table_sizes(&self) -> Result<TableSizes, IndexError> {
        Ok(self.store.table_sizes()?)
    }

    /// Drop every table. Buffered elements are kept.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn purge(&mut self) -> Result<(), IndexError> {
        self.session.ensure_open(&mut self.store)?;
        self.store.purge()?;
        log::info!("purged tag index");
        Ok(())
    }

    /// Commit the write session. Buffered elements are not flushed.
    ///
    /// # Errors
    /// Propagates store failures; the session stays open.
    pub fn commit(&mut self) -> Result<(), IndexError> {
        Ok(self.session.commit(&mut self.store)?)
    }

    /// Discard every write of the session. Buffered elements are kept.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn rollback(&mut self) -> Result<(), IndexError> {
        Ok(self.session.rollback(&mut self.store)?)
    }

    /// Flush the buffer and commit.
    ///
    /// # Errors
    /// Returns the flush or commit failure. Nothing is retried on drop.
    pub fn close(mut self) -> Result<UpdateStats, IndexError> {
        self.closed = true;
        self.release()
    }

    fn release(&mut self) -> Result<UpdateStats, IndexError> {
        let stats = self.flush()?;
        self.commit()?;
        Ok(stats)
    }
}

impl<S, R> Drop for XapiIndex<S, R>
where
    S: TagIndexStore,
    R: BboxResolver,
{
    fn drop(&mut self) {
        if self.closed || (self.buffer.is_empty() && !self.session.is_open()) {
            return;
        }
        if let Err(err) = self.release() {
            log::error!("failed to flush tag index on drop: {err}");
        }
    }
}
