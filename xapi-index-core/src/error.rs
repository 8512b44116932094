//! Errors surfaced by [`XapiIndex`](crate::XapiIndex).

use thiserror::Error;

use crate::{bbox::BoundingBox, element::ElementRef, resolver::ResolveBboxError, store::StoreError};

/// Failure of an update, removal, query or session operation.
///
/// Every variant is fatal to the call that raised it; nothing is retried.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A tagged node carried no position.
    #[error("node {element} has no coordinates")]
    MissingCoordinates {
        /// Offending node.
        element: ElementRef,
    },
    /// A bbox had non-finite or inverted edges.
    #[error("bbox {bbox:?} of {element} is malformed")]
    MalformedBbox {
        /// Element the bbox belongs to.
        element: ElementRef,
        /// Rejected bbox.
        bbox: BoundingBox,
    },
    /// The resolver knew nothing about a way or relation.
    #[error("no bbox could be resolved for {element}")]
    MissingBbox {
        /// Element the resolver could not place.
        element: ElementRef,
    },
    /// The resolver reported a failure.
    #[error(transparent)]
    ResolveBbox(#[from] ResolveBboxError),
    /// A query named no key.
    #[error("query key must not be empty")]
    EmptyKey,
}
