//! `purge` and `stats` commands.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use xapi_index_core::ElementSetResolver;

use crate::{ARG_DATABASE, CliError, DatabaseConfig, write_line};

pub(crate) const ENV_PURGE_DATABASE: &str = "XAPI_INDEX_CMDS_PURGE_DATABASE";
pub(crate) const ENV_STATS_DATABASE: &str = "XAPI_INDEX_CMDS_STATS_DATABASE";

/// CLI arguments for the `purge` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "purge", about = "Drop every table of the index")]
#[ortho_config(prefix = "XAPI_INDEX")]
pub(crate) struct PurgeArgs {
    /// Path to the SQLite tag index.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

impl PurgeArgs {
    pub(crate) fn into_config(self) -> Result<DatabaseConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        DatabaseConfig::resolve(merged.database, None, ENV_PURGE_DATABASE)
    }
}

/// CLI arguments for the `stats` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "stats", about = "Print row counts per table")]
#[ortho_config(prefix = "XAPI_INDEX")]
pub(crate) struct StatsArgs {
    /// Path to the SQLite tag index.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

impl StatsArgs {
    pub(crate) fn into_config(self) -> Result<DatabaseConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        DatabaseConfig::resolve(merged.database, None, ENV_STATS_DATABASE)
    }
}

pub(crate) fn run_purge(config: &DatabaseConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let mut index = config.open(ElementSetResolver::default())?;
    let keys = index.stored_keys().len();
    index.purge()?;
    index.close()?;
    write_line(writer, &format!("purged {keys} keys from {}", config.path))
}

/// One `table<TAB>rows` line per table, sorted by table name.
pub(crate) fn run_stats(config: &DatabaseConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let index = config.open(ElementSetResolver::default())?;
    for (table, rows) in index.table_sizes()? {
        write_line(writer, &format!("{table}\t{rows}"))?;
    }
    index.close()?;
    Ok(())
}
