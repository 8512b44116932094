//! Engine tuning.

use serde::{Deserialize, Serialize};

/// Default update buffer high-water mark and query result cap.
pub const DEFAULT_MAX_RECORDS: usize = 1000;

/// Settings for an [`XapiIndex`](crate::XapiIndex).
///
/// # Examples
/// ```
/// use xapi_index_core::{DEFAULT_MAX_RECORDS, IndexConfig};
///
/// assert_eq!(IndexConfig::default().max_records, DEFAULT_MAX_RECORDS);
/// let config: IndexConfig = serde_json::from_str(r#"{"max_records": 50}"#).expect("valid");
/// assert_eq!(config, IndexConfig::default().with_max_records(50));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Buffered elements tolerated before an automatic flush, and the result
    /// cap of queries that do not set their own.
    pub max_records: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
        }
    }
}

impl IndexConfig {
    /// Replace the record limit.
    #[must_use]
    pub const fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }
}
