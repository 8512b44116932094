//! Tag-key normalisation and the registry of per-key tables.
//!
//! Every distinct tag key owns a pair of tables: a position index named
//! `<key>_pos` and an attribute store named `<key>_data`. Keys are sanitised
//! before use so that the `_` separator can never appear inside a key and so
//! that keys differing only by case share one table pair.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

/// Suffix of position index tables.
pub const POSITION_SUFFIX: &str = "_pos";
/// Suffix of attribute store tables.
pub const ATTRIBUTE_SUFFIX: &str = "_data";

/// Shadow tables maintained by an R*Tree implementation alongside each
/// position index. They are never reported as registry entries.
const INDEX_ARTIFACT_SUFFIXES: [&str; 3] = ["_node", "_rowid", "_parent"];

/// Normalise a caller-supplied tag key.
///
/// The key is percent-encoded (RFC 3986 unreserved characters pass through),
/// underscores are then rewritten to `%95`, and the result is lowercased.
///
/// # Examples
/// ```
/// use xapi_index_core::sanitize_key;
///
/// assert_eq!(sanitize_key("addr:street"), "addr%3astreet");
/// assert_eq!(sanitize_key("name_en"), "name%95en");
/// assert_eq!(sanitize_key("Amenity"), sanitize_key("amenity"));
/// ```
#[must_use]
pub fn sanitize_key(key: &str) -> String {
    urlencoding::encode(key).replace('_', "%95").to_lowercase()
}

/// A sanitised tag key naming one position/attribute table pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagKey(String);

impl TagKey {
    /// Sanitise a raw tag key.
    #[must_use]
    pub fn sanitize(raw: &str) -> Self {
        Self(sanitize_key(raw))
    }

    /// Wrap a value that is already sanitised, such as a key read back from
    /// storage.
    pub(crate) const fn from_sanitized(key: String) -> Self {
        Self(key)
    }

    /// The sanitised key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Names of the table pair backing this key.
    #[must_use]
    pub fn table_names(&self) -> TableNames {
        TableNames {
            position: format!("{}{POSITION_SUFFIX}", self.0),
            attribute: format!("{}{ATTRIBUTE_SUFFIX}", self.0),
        }
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Table names for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    /// Bounding-box index keyed by row id.
    pub position: String,
    /// Element attributes keyed by the same row id.
    pub attribute: String,
}

/// In-process view of the tables present in the backing store.
///
/// The registry is refreshed after every table creation so that repeated
/// `ensure` calls never attempt a duplicate `CREATE`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaRegistry {
    tables: BTreeSet<String>,
}

impl SchemaRegistry {
    /// Build a registry from a store's object list, ignoring R*Tree shadow
    /// tables.
    #[must_use]
    pub fn from_tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tables: tables
                .into_iter()
                .map(Into::into)
                .filter(|name| !is_index_artifact(name))
                .collect(),
        }
    }

    /// Record both tables of `key` as present.
    pub fn register(&mut self, key: &TagKey) {
        let names = key.table_names();
        self.tables.insert(names.position);
        self.tables.insert(names.attribute);
    }

    /// Whether a table of this exact name is known.
    #[must_use]
    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains(name)
    }

    /// Whether `key` has a position index.
    #[must_use]
    pub fn has_key(&self, key: &TagKey) -> bool {
        self.contains_table(&key.table_names().position)
    }

    /// All keys with a position index, in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<TagKey> {
        self.tables
            .iter()
            .filter_map(|name| name.strip_suffix(POSITION_SUFFIX))
            .map(|key| TagKey::from_sanitized(key.to_owned()))
            .collect()
    }

    /// Every known table, in sorted order.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(String::as_str)
    }

    /// Forget every table.
    pub fn clear(&mut self) {
        self.tables.clear();
    }
}

fn is_index_artifact(name: &str) -> bool {
    INDEX_ARTIFACT_SUFFIXES
        .iter()
        .any(|suffix| name.len() > suffix.len() && name.ends_with(suffix))
}
