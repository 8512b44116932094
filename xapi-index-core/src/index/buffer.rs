//! Pending element updates.

use crate::element::Element;

/// Ordered queue of elements awaiting a flush.
///
/// Buffered elements are invisible to queries until flushed.
#[derive(Debug, Clone, Default)]
pub(crate) struct UpdateBuffer {
    pending: Vec<Element>,
}

impl UpdateBuffer {
    pub(crate) fn extend<I>(&mut self, elements: I)
    where
        I: IntoIterator<Item = Element>,
    {
        self.pending.extend(elements);
    }

    pub(crate) const fn as_slice(&self) -> &[Element] {
        self.pending.as_slice()
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// True once more than `high_water` elements are queued.
    pub(crate) const fn exceeds(&self, high_water: usize) -> bool {
        self.pending.len() > high_water
    }

    pub(crate) fn take(&mut self) -> Vec<Element> {
        std::mem::take(&mut self.pending)
    }

    /// Put a batch back in front of anything queued since it was taken.
    pub(crate) fn restore(&mut self, mut batch: Vec<Element>) {
        batch.append(&mut self.pending);
        self.pending = batch;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Tags;
    use geo::Coord;
    use rstest::rstest;

    fn node(id: i64) -> Element {
        Element::node(id, Coord { x: 0.0, y: 0.0 }, Tags::new())
    }

    #[rstest]
    fn high_water_mark_is_exclusive() {
        let mut buffer = UpdateBuffer::default();
        buffer.extend([node(1), node(2)]);
        assert!(!buffer.exceeds(2));
        buffer.extend([node(3)]);
        assert!(buffer.exceeds(2));
    }

    #[rstest]
    fn restore_keeps_original_order() {
        let mut buffer = UpdateBuffer::default();
        buffer.extend([node(1), node(2)]);
        let batch = buffer.take();
        assert!(buffer.is_empty());
        buffer.extend([node(3)]);
        buffer.restore(batch);
        let ids: Vec<_> = buffer.as_slice().iter().map(|element| element.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
