//! Bounding boxes at the API boundary and in stored order.
//!
//! Callers exchange [`BoundingBox`] values in `(minLon, minLat, maxLon,
//! maxLat)` order. Position records keep the same four numbers reordered as
//! `(minLat, maxLat, minLon, maxLon)`; [`PositionBox`] is that stored form.

use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in WGS84 degrees, API order.
///
/// Corners are kept exactly as supplied; no normalisation takes place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western edge.
    pub min_lon: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Eastern edge.
    pub max_lon: f64,
    /// Northern edge.
    pub max_lat: f64,
}

impl BoundingBox {
    /// Whole-world extent used when a query omits its bbox.
    pub const WORLD: Self = Self::new(-180.0, -90.0, 180.0, 90.0);

    /// Construct a bbox from API-ordered edges.
    #[must_use]
    pub const fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Degenerate bbox covering a single position.
    #[must_use]
    pub const fn point(location: Coord<f64>) -> Self {
        Self::new(location.x, location.y, location.x, location.y)
    }

    /// True when all four edges are finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
            .iter()
            .all(|edge| edge.is_finite())
    }

    /// True when the edges are finite and neither axis is inverted.
    ///
    /// Only well-formed boxes are written to a position index.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.is_finite() && self.min_lon <= self.max_lon && self.min_lat <= self.max_lat
    }

    /// Smallest bbox enclosing both operands.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self::new(
            self.min_lon.min(other.min_lon),
            self.min_lat.min(other.min_lat),
            self.max_lon.max(other.max_lon),
            self.max_lat.max(other.max_lat),
        )
    }

    /// The edges as an API-ordered array.
    #[must_use]
    pub const fn to_array(self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([min_lon, min_lat, max_lon, max_lat]: [f64; 4]) -> Self {
        Self::new(min_lon, min_lat, max_lon, max_lat)
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

/// Stored form of a bbox: `(minLat, maxLat, minLon, maxLon)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lon: f64,
    /// Eastern edge.
    pub max_lon: f64,
}

impl PositionBox {
    /// Strict containment: every edge lies inside `query`, none on it.
    ///
    /// An element touching the query boundary is not contained, and elements
    /// merely overlapping the query are never matched.
    ///
    /// # Examples
    /// ```
    /// use geo::Coord;
    /// use xapi_index_core::{BoundingBox, PositionBox};
    ///
    /// let stored = PositionBox::from(BoundingBox::point(Coord { x: 2.0, y: 2.0 }));
    /// assert!(stored.is_strictly_within(&BoundingBox::new(0.0, 0.0, 5.0, 5.0)));
    /// assert!(!stored.is_strictly_within(&BoundingBox::new(2.0, 0.0, 5.0, 5.0)));
    /// ```
    #[must_use]
    pub fn is_strictly_within(&self, query: &BoundingBox) -> bool {
        self.min_lat > query.min_lat
            && self.max_lat < query.max_lat
            && self.max_lon < query.max_lon
            && self.min_lon > query.min_lon
    }

    /// Convert back to API order.
    #[must_use]
    pub const fn to_bounding_box(self) -> BoundingBox {
        BoundingBox::new(self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }
}

impl From<BoundingBox> for PositionBox {
    fn from(bbox: BoundingBox) -> Self {
        Self {
            min_lat: bbox.min_lat,
            max_lat: bbox.max_lat,
            min_lon: bbox.min_lon,
            max_lon: bbox.max_lon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn stored(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> PositionBox {
        PositionBox::from(BoundingBox::new(min_lon, min_lat, max_lon, max_lat))
    }

    #[rstest]
    fn reorders_into_stored_layout() {
        let position = stored(1.0, 2.0, 3.0, 4.0);
        assert_eq!(
            position,
            PositionBox {
                min_lat: 2.0,
                max_lat: 4.0,
                min_lon: 1.0,
                max_lon: 3.0,
            }
        );
        assert_eq!(
            position.to_bounding_box(),
            BoundingBox::new(1.0, 2.0, 3.0, 4.0)
        );
    }

    #[rstest]
    #[case(BoundingBox::new(0.0, 0.0, 5.0, 5.0), true)]
    #[case(BoundingBox::new(2.0, 0.0, 5.0, 5.0), false)] // min_lon edge
    #[case(BoundingBox::new(0.0, 2.0, 5.0, 5.0), false)] // min_lat edge
    #[case(BoundingBox::new(0.0, 0.0, 2.0, 5.0), false)] // max_lon edge
    #[case(BoundingBox::new(0.0, 0.0, 5.0, 2.0), false)] // max_lat edge
    #[case(BoundingBox::new(3.0, 3.0, 5.0, 5.0), false)] // disjoint
    fn point_containment_is_strict(#[case] query: BoundingBox, #[case] expected: bool) {
        let point = PositionBox::from(BoundingBox::point(Coord { x: 2.0, y: 2.0 }));
        assert_eq!(point.is_strictly_within(&query), expected);
    }

    #[rstest]
    fn overlapping_extent_is_not_contained() {
        let area = stored(1.0, 1.0, 6.0, 3.0);
        assert!(!area.is_strictly_within(&BoundingBox::new(0.0, 0.0, 5.0, 5.0)));
        assert!(area.is_strictly_within(&BoundingBox::new(0.0, 0.0, 7.0, 5.0)));
    }

    #[rstest]
    fn nan_edges_never_match() {
        let broken = stored(f64::NAN, 1.0, 1.0, 1.0);
        assert!(!broken.is_strictly_within(&BoundingBox::WORLD));
        assert!(!BoundingBox::new(f64::NAN, 0.0, 0.0, 0.0).is_finite());
    }

    #[rstest]
    #[case(BoundingBox::new(1.0, 1.0, 1.0, 1.0), true)]
    #[case(BoundingBox::new(0.0, 0.0, 1.0, 1.0), true)]
    #[case(BoundingBox::new(1.0, 0.0, 0.0, 1.0), false)]
    #[case(BoundingBox::new(0.0, 1.0, 1.0, 0.0), false)]
    #[case(BoundingBox::new(0.0, 0.0, f64::INFINITY, 1.0), false)]
    fn well_formed_boxes(#[case] bbox: BoundingBox, #[case] expected: bool) {
        assert_eq!(bbox.is_well_formed(), expected);
    }

    #[rstest]
    fn union_covers_both_operands() {
        let merged = BoundingBox::new(0.0, 0.0, 1.0, 1.0).union(BoundingBox::new(-2.0, 0.5, 0.5, 3.0));
        assert_eq!(merged, BoundingBox::new(-2.0, 0.0, 1.0, 3.0));
    }
}
