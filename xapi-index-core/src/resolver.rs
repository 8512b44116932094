//! Bounding-box resolution for ways and relations.
//!
//! Nodes carry their own position. Extended geometries depend on their
//! members, so the index asks a [`BboxResolver`] for them instead.

use std::collections::{HashMap, HashSet};

use geo::{BoundingRect, Coord, MultiPoint, Point};
use thiserror::Error;

use crate::{
    bbox::BoundingBox,
    element::{Element, ElementKind, ElementRef},
};

/// Failure reported by a [`BboxResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to resolve bbox of {element}: {message}")]
pub struct ResolveBboxError {
    /// Element whose bbox was requested.
    pub element: ElementRef,
    /// Description of the failure.
    pub message: String,
}

/// Computes `(minLon, minLat, maxLon, maxLat)` for elements without an
/// intrinsic position.
///
/// Returning `Ok(None)` means the element is unknown to the resolver; the
/// index treats that the same as an error and refuses to guess.
pub trait BboxResolver {
    /// Resolve the bbox of `element`.
    ///
    /// # Errors
    /// Implementations return [`ResolveBboxError`] when the lookup itself
    /// fails.
    fn resolve_bbox(&self, element: &ElementRef) -> Result<Option<BoundingBox>, ResolveBboxError>;
}

/// Resolver over a self-contained set of elements.
///
/// Way bboxes enclose their member nodes. Relation bboxes enclose the union
/// of their members, recursively; members already being resolved further up
/// the chain are skipped so relation cycles terminate. Members absent from
/// the set are skipped with a warning.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use xapi_index_core::{BboxResolver, BoundingBox, Element, ElementRef, ElementSetResolver, Tags};
///
/// let resolver = ElementSetResolver::from_elements([
///     Element::node(1, Coord { x: 0.0, y: 1.0 }, Tags::new()),
///     Element::node(2, Coord { x: 2.0, y: 3.0 }, Tags::new()),
///     Element::way(10, [1, 2], Tags::new()),
/// ]);
/// let bbox = resolver.resolve_bbox(&ElementRef::way(10)).expect("resolves");
/// assert_eq!(bbox, Some(BoundingBox::new(0.0, 1.0, 2.0, 3.0)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ElementSetResolver {
    elements: HashMap<ElementRef, Element>,
}

impl ElementSetResolver {
    /// Build a resolver from `elements`; later duplicates replace earlier ones.
    #[must_use]
    pub fn from_elements<I>(elements: I) -> Self
    where
        I: IntoIterator<Item = Element>,
    {
        let mut resolver = Self::default();
        resolver.extend(elements);
        resolver
    }

    /// Add or replace elements.
    pub fn extend<I>(&mut self, elements: I)
    where
        I: IntoIterator<Item = Element>,
    {
        self.elements.extend(
            elements
                .into_iter()
                .map(|element| (element.reference(), element)),
        );
    }

    /// Number of known elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the resolver knows no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn bbox_of(
        &self,
        reference: &ElementRef,
        visiting: &mut HashSet<ElementRef>,
    ) -> Option<BoundingBox> {
        let Some(element) = self.elements.get(reference) else {
            log::warn!("{reference} is not in the element set");
            return None;
        };
        match element.kind {
            ElementKind::Node => element.location.map(BoundingBox::point),
            ElementKind::Way => self.way_bbox(element),
            ElementKind::Relation => {
                if !visiting.insert(*reference) {
                    return None;
                }
                let bbox = element
                    .members
                    .iter()
                    .filter_map(|member| self.bbox_of(&member.element_ref(), visiting))
                    .reduce(BoundingBox::union);
                visiting.remove(reference);
                bbox
            }
        }
    }

    fn way_bbox(&self, way: &Element) -> Option<BoundingBox> {
        let points: Vec<Point<f64>> = way
            .members
            .iter()
            .filter_map(|member| self.node_location(&member.element_ref()))
            .map(Point::from)
            .collect();
        MultiPoint::new(points).bounding_rect().map(BoundingBox::from)
    }

    fn node_location(&self, reference: &ElementRef) -> Option<Coord<f64>> {
        let location = self
            .elements
            .get(reference)
            .filter(|element| element.kind == ElementKind::Node)
            .and_then(|node| node.location);
        if location.is_none() {
            log::warn!("way member {reference} has no known position");
        }
        location
    }
}

impl BboxResolver for ElementSetResolver {
    fn resolve_bbox(&self, element: &ElementRef) -> Result<Option<BoundingBox>, ResolveBboxError> {
        Ok(self.bbox_of(element, &mut HashSet::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Member, Tags};
    use rstest::{fixture, rstest};

    fn node(id: i64, x: f64, y: f64) -> Element {
        Element::node(id, Coord { x, y }, Tags::new())
    }

    #[fixture]
    fn resolver() -> ElementSetResolver {
        ElementSetResolver::from_elements([
            node(1, 0.0, 0.0),
            node(2, 4.0, 2.0),
            node(3, -1.0, 5.0),
            Element::way(10, [1, 2], Tags::new()),
            Element::way(11, [3, 99], Tags::new()),
            Element::relation(
                20,
                vec![
                    Member::with_role(ElementKind::Way, 10, "outer"),
                    Member::new(ElementKind::Node, 3),
                ],
                Tags::new(),
            ),
            Element::relation(
                21,
                vec![
                    Member::new(ElementKind::Relation, 22),
                    Member::new(ElementKind::Node, 1),
                ],
                Tags::new(),
            ),
            Element::relation(
                22,
                vec![
                    Member::new(ElementKind::Relation, 21),
                    Member::new(ElementKind::Node, 2),
                ],
                Tags::new(),
            ),
        ])
    }

    #[rstest]
    #[case(ElementRef::node(2), Some(BoundingBox::new(4.0, 2.0, 4.0, 2.0)))]
    #[case(ElementRef::way(10), Some(BoundingBox::new(0.0, 0.0, 4.0, 2.0)))]
    #[case(ElementRef::way(11), Some(BoundingBox::new(-1.0, 5.0, -1.0, 5.0)))]
    #[case(ElementRef::relation(20), Some(BoundingBox::new(-1.0, 0.0, 4.0, 5.0)))]
    #[case(ElementRef::relation(21), Some(BoundingBox::new(0.0, 0.0, 4.0, 2.0)))]
    #[case(ElementRef::way(404), None)]
    fn resolves_member_extents(
        resolver: ElementSetResolver,
        #[case] element: ElementRef,
        #[case] expected: Option<BoundingBox>,
    ) {
        assert_eq!(resolver.resolve_bbox(&element), Ok(expected));
    }

    #[rstest]
    fn way_without_known_nodes_has_no_bbox() {
        let resolver = ElementSetResolver::from_elements([Element::way(1, [5, 6], Tags::new())]);
        assert_eq!(resolver.resolve_bbox(&ElementRef::way(1)), Ok(None));
        assert_eq!(resolver.len(), 1);
        assert!(!resolver.is_empty());
    }
}
