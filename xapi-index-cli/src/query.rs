//! `query` command: print the elements matching an XAPI filter.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use xapi_index_core::{BoundingBox, ElementKind, ElementSetResolver, XapiQuery};

use crate::{ARG_DATABASE, ARG_KEY, ARG_MAX_RECORDS, CliError, DatabaseConfig, write_line};

pub(crate) const ENV_QUERY_KEY: &str = "XAPI_INDEX_CMDS_QUERY_KEY";
pub(crate) const ENV_QUERY_DATABASE: &str = "XAPI_INDEX_CMDS_QUERY_DATABASE";

/// CLI arguments for the `query` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "query",
    long_about = "Print one element reference per line for every element \
                 tagged with KEY (and VALUE, when given) whose bounding box \
                 lies strictly inside the search area. Keys and values \
                 accept `|`-separated alternatives.",
    about = "Find elements by tag, type and bounding box"
)]
#[ortho_config(prefix = "XAPI_INDEX")]
pub(crate) struct QueryArgs {
    /// Tag key, e.g. `amenity` or `amenity|shop`.
    #[arg(long = ARG_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) key: Option<String>,
    /// Tag value, e.g. `cafe` or `cafe|pub`.
    #[arg(long, value_name = "value")]
    #[serde(default)]
    pub(crate) value: Option<String>,
    /// Restrict results to `node`, `way` or `relation`.
    #[arg(long = "type", value_name = "type")]
    #[serde(default)]
    pub(crate) kind: Option<String>,
    /// Search area as `minlon,minlat,maxlon,maxlat`; the whole world if unset.
    #[arg(long, value_name = "bbox", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) bbox: Option<String>,
    /// Path to the SQLite tag index.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Result cap per key alternative.
    #[arg(long = ARG_MAX_RECORDS, value_name = "n")]
    #[serde(default)]
    pub(crate) max_records: Option<usize>,
}

impl QueryArgs {
    pub(crate) fn into_config(self) -> Result<QueryConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        QueryConfig::try_from(merged)
    }
}

/// Resolved `query` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QueryConfig {
    pub(crate) query: XapiQuery,
    pub(crate) database: DatabaseConfig,
}

impl TryFrom<QueryArgs> for QueryConfig {
    type Error = CliError;

    fn try_from(args: QueryArgs) -> Result<Self, Self::Error> {
        let key = args.key.ok_or(CliError::MissingArgument {
            field: ARG_KEY,
            env: ENV_QUERY_KEY,
        })?;
        let database =
            DatabaseConfig::resolve(args.database, args.max_records, ENV_QUERY_DATABASE)?;

        let mut query = XapiQuery::new(key);
        if let Some(value) = args.value {
            query = query.with_value(value);
        }
        if let Some(kind) = args.kind {
            query = query.with_kind(kind.parse::<ElementKind>()?);
        }
        if let Some(bbox) = args.bbox {
            query = query.with_bbox(parse_bbox(&bbox)?);
        }
        Ok(Self { query, database })
    }
}

/// Parse `minlon,minlat,maxlon,maxlat`.
pub(crate) fn parse_bbox(value: &str) -> Result<BoundingBox, CliError> {
    let invalid = || CliError::InvalidBbox {
        value: value.to_owned(),
    };
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f64>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;
    let corners: [f64; 4] = parts.try_into().map_err(|_| invalid())?;
    Ok(BoundingBox::from(corners))
}

pub(crate) fn run_query(config: &QueryConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let index = config.database.open(ElementSetResolver::default())?;
    let found = index.query(&config.query)?;
    log::debug!("query {:?} matched {} elements", config.query.key, found.len());
    for element in &found {
        write_line(writer, &element.to_string())?;
    }
    index.close()?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<QueryConfig, CliError> {
    let merged = QueryArgs::merge_from_layers(layers).map_err(CliError::from)?;
    QueryConfig::try_from(merged)
}
