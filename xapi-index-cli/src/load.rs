//! `load` command: index the elements of a JSON file.

use std::io::{BufReader, Write};

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use xapi_index_core::{Element, ElementSetResolver, UpdateStats};

use crate::{
    ARG_DATABASE, ARG_INPUT, ARG_MAX_RECORDS, CliError, DatabaseConfig, fs::open_utf8_file,
    write_line,
};

pub(crate) const ENV_LOAD_INPUT: &str = "XAPI_INDEX_CMDS_LOAD_INPUT";
pub(crate) const ENV_LOAD_DATABASE: &str = "XAPI_INDEX_CMDS_LOAD_DATABASE";

/// CLI arguments for the `load` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "load",
    long_about = "Index every tagged element of a JSON array of nodes, ways \
                 and relations. Way and relation bounding boxes are derived \
                 from the member elements found in the same file.",
    about = "Index elements from a JSON file"
)]
#[ortho_config(prefix = "XAPI_INDEX")]
pub(crate) struct LoadArgs {
    /// Path to the JSON element file.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) input: Option<Utf8PathBuf>,
    /// Path to the SQLite tag index.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Buffered elements tolerated before an intermediate flush.
    #[arg(long = ARG_MAX_RECORDS, value_name = "n")]
    #[serde(default)]
    pub(crate) max_records: Option<usize>,
}

impl LoadArgs {
    pub(crate) fn into_config(self) -> Result<LoadConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        LoadConfig::try_from(merged)
    }
}

/// Resolved `load` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoadConfig {
    pub(crate) input: Utf8PathBuf,
    pub(crate) database: DatabaseConfig,
}

impl TryFrom<LoadArgs> for LoadConfig {
    type Error = CliError;

    fn try_from(args: LoadArgs) -> Result<Self, Self::Error> {
        let input = args.input.ok_or(CliError::MissingArgument {
            field: ARG_INPUT,
            env: ENV_LOAD_INPUT,
        })?;
        let database =
            DatabaseConfig::resolve(args.database, args.max_records, ENV_LOAD_DATABASE)?;
        Ok(Self { input, database })
    }
}

pub(crate) fn run_load(config: &LoadConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let elements = read_elements(&config.input)?;
    log::info!("read {} elements from {}", elements.len(), config.input);
    let resolver = ElementSetResolver::from_elements(elements.iter().cloned());
    let mut index = config.database.open(resolver)?;
    let flushed = index.add_elements_to_buffer(elements)?.unwrap_or_default();
    let closed = index.close()?;
    let total = UpdateStats {
        elements: flushed.elements + closed.elements,
        inserts: flushed.inserts + closed.inserts,
    };
    write_line(
        writer,
        &format!(
            "indexed {} elements into {} tag rows",
            total.elements, total.inserts
        ),
    )
}

/// Loads a JSON array of [`Element`]s from disk.
pub(crate) fn read_elements(path: &Utf8Path) -> Result<Vec<Element>, CliError> {
    let file = open_utf8_file(path).map_err(|source| CliError::OpenElements {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CliError::ParseElements {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<LoadConfig, CliError> {
    let merged = LoadArgs::merge_from_layers(layers).map_err(CliError::from)?;
    LoadConfig::try_from(merged)
}
