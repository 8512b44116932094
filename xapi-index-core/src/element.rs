//! Element model consumed by the index.
//!
//! Elements mirror OpenStreetMap's node/way/relation structure. Only the parts
//! the index needs are modelled: identity, tags, member references and, for
//! nodes, the position. Coordinates are WGS84 with `x = longitude` and
//! `y = latitude`.

use std::{fmt, num::ParseIntError, str::FromStr};

use geo::Coord;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Free-form key/value tags attached to an element.
///
/// Iteration follows the caller's key order, which fixes the order in which
/// per-key rows are inserted and which of two colliding keys is indexed.
pub type Tags = IndexMap<String, String>;

/// The three element types of the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// A point with coordinates.
    Node,
    /// An ordered list of node references.
    Way,
    /// A collection of typed members with roles.
    Relation,
}

impl ElementKind {
    /// Integer code persisted in the attribute store (`node=1`, `way=2`,
    /// `relation=3`).
    #[must_use]
    pub const fn type_code(self) -> i64 {
        match self {
            Self::Node => 1,
            Self::Way => 2,
            Self::Relation => 3,
        }
    }

    /// Inverse of [`ElementKind::type_code`].
    #[must_use]
    pub const fn from_type_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Node),
            2 => Some(Self::Way),
            3 => Some(Self::Relation),
            _ => None,
        }
    }

    /// Lowercase name used in element references.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a type name is not one of `node`, `way` or `relation`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown element type {found:?}")]
pub struct UnknownElementType {
    /// The rejected type name.
    pub found: String,
}

impl FromStr for ElementKind {
    type Err = UnknownElementType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "node" => Ok(Self::Node),
            "way" => Ok(Self::Way),
            "relation" => Ok(Self::Relation),
            other => Err(UnknownElementType {
                found: other.to_owned(),
            }),
        }
    }
}

/// Identity of an element: its type plus numeric id.
///
/// Displays as `"<type>-<id>"`, the form stored in the attribute store and
/// returned by queries.
///
/// # Examples
/// ```
/// use xapi_index_core::ElementRef;
///
/// let reference = ElementRef::way(42);
/// assert_eq!(reference.to_string(), "way-42");
/// assert_eq!("way-42".parse::<ElementRef>(), Ok(reference));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef {
    /// Element type.
    pub kind: ElementKind,
    /// Element id, unique per type.
    pub id: i64,
}

impl ElementRef {
    /// Construct a reference from its parts.
    #[must_use]
    pub const fn new(kind: ElementKind, id: i64) -> Self {
        Self { kind, id }
    }

    /// Reference a node.
    #[must_use]
    pub const fn node(id: i64) -> Self {
        Self::new(ElementKind::Node, id)
    }

    /// Reference a way.
    #[must_use]
    pub const fn way(id: i64) -> Self {
        Self::new(ElementKind::Way, id)
    }

    /// Reference a relation.
    #[must_use]
    pub const fn relation(id: i64) -> Self {
        Self::new(ElementKind::Relation, id)
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.id)
    }
}

/// Errors returned when parsing an `"<type>-<id>"` string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseElementRefError {
    /// The value had no `-` separator.
    #[error("element reference {value:?} is not of the form <type>-<id>")]
    InvalidFormat {
        /// The rejected value.
        value: String,
    },
    /// The type prefix was not recognised.
    #[error(transparent)]
    UnknownType(#[from] UnknownElementType),
    /// The id suffix was not an integer.
    #[error("element reference {value:?} has a non-integer id")]
    InvalidId {
        /// The rejected value.
        value: String,
        /// Integer parsing failure.
        #[source]
        source: ParseIntError,
    },
}

impl FromStr for ElementRef {
    type Err = ParseElementRefError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (kind_part, id_part) =
            value
                .split_once('-')
                .ok_or_else(|| ParseElementRefError::InvalidFormat {
                    value: value.to_owned(),
                })?;
        let kind = kind_part.parse::<ElementKind>()?;
        let id = id_part
            .parse::<i64>()
            .map_err(|source| ParseElementRefError::InvalidId {
                value: value.to_owned(),
                source,
            })?;
        Ok(Self::new(kind, id))
    }
}

/// A member reference of a way or relation.
///
/// Way node lists are represented as members of type `node` without a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Type of the referenced element.
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// Id of the referenced element.
    #[serde(rename = "ref")]
    pub reference: i64,
    /// Relation role, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Member {
    /// A member without a role.
    #[must_use]
    pub const fn new(kind: ElementKind, reference: i64) -> Self {
        Self {
            kind,
            reference,
            role: None,
        }
    }

    /// A member carrying a relation role.
    #[must_use]
    pub fn with_role(kind: ElementKind, reference: i64, role: impl Into<String>) -> Self {
        Self {
            kind,
            reference,
            role: Some(role.into()),
        }
    }

    /// Reference to the member element.
    #[must_use]
    pub const fn element_ref(&self) -> ElementRef {
        ElementRef::new(self.kind, self.reference)
    }
}

/// An element with its current tags.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use xapi_index_core::{Element, ElementRef, Tags};
///
/// let cafe = Element::node(
///     1,
///     Coord { x: 10.0, y: 10.0 },
///     Tags::from([("amenity".into(), "cafe".into())]),
/// );
/// assert_eq!(cafe.reference(), ElementRef::node(1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Element type.
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// Element id.
    pub id: i64,
    /// Current tags; an empty map removes the element from the index.
    #[serde(default)]
    pub tags: Tags,
    /// Way nodes or relation members.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Member>,
    /// Position of a node. Unused for ways and relations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coord<f64>>,
}

impl Element {
    /// A node at `location`.
    #[must_use]
    pub const fn node(id: i64, location: Coord<f64>, tags: Tags) -> Self {
        Self {
            kind: ElementKind::Node,
            id,
            tags,
            members: Vec::new(),
            location: Some(location),
        }
    }

    /// A way over the given node ids.
    #[must_use]
    pub fn way<I>(id: i64, node_ids: I, tags: Tags) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        Self {
            kind: ElementKind::Way,
            id,
            tags,
            members: node_ids
                .into_iter()
                .map(|node| Member::new(ElementKind::Node, node))
                .collect(),
            location: None,
        }
    }

    /// A relation with the given members.
    #[must_use]
    pub const fn relation(id: i64, members: Vec<Member>, tags: Tags) -> Self {
        Self {
            kind: ElementKind::Relation,
            id,
            tags,
            members,
            location: None,
        }
    }

    /// Identity of this element.
    #[must_use]
    pub const fn reference(&self) -> ElementRef {
        ElementRef::new(self.kind, self.id)
    }

    /// Whether the members include at least one node and at least one way.
    #[must_use]
    pub fn member_flags(&self) -> (bool, bool) {
        let has_nodes = self
            .members
            .iter()
            .any(|member| member.kind == ElementKind::Node);
        let has_ways = self
            .members
            .iter()
            .any(|member| member.kind == ElementKind::Way);
        (has_nodes, has_ways)
    }
}

/// Notification that an element changed, together with the parents whose
/// bounding boxes depend on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementChange {
    /// The changed element in its new state.
    pub element: Element,
    /// Ways and relations referencing the changed element.
    #[serde(default)]
    pub parents: Vec<Element>,
}
