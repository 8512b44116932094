//! Command-line interface for building and querying an XAPI tag index.
//!
//! Every subcommand works on one SQLite database. Options are layered with
//! `ortho_config`: CLI flags override `XAPI_INDEX_CMDS_<COMMAND>_*`
//! environment variables, which override the configuration file.
#![forbid(unsafe_code)]

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use xapi_index_core::{
    BboxResolver, DEFAULT_MAX_RECORDS, IndexConfig, SqliteTagIndexStore, XapiIndex,
};

mod error;
mod fs;
mod load;
mod maintenance;
mod query;

pub use error::CliError;

use load::LoadArgs;
use maintenance::{PurgeArgs, StatsArgs};
use query::QueryArgs;

const ARG_DATABASE: &str = "database";
const ARG_MAX_RECORDS: &str = "max-records";
const ARG_INPUT: &str = "input";
const ARG_KEY: &str = "key";

/// Run the CLI with the current process arguments and environment.
///
/// # Errors
/// Returns the first failure of argument parsing, configuration merging or
/// the selected command.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse()?;
    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Load(args) => load::run_load(&args.into_config()?, &mut stdout),
        Command::Query(args) => query::run_query(&args.into_config()?, &mut stdout),
        Command::Purge(args) => maintenance::run_purge(&args.into_config()?, &mut stdout),
        Command::Stats(args) => maintenance::run_stats(&args.into_config()?, &mut stdout),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "xapi-index",
    about = "Build and query a spatial tag index of map elements",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Index elements from a JSON file.
    Load(LoadArgs),
    /// Find elements by tag, type and bounding box.
    Query(QueryArgs),
    /// Drop every table of the index.
    Purge(PurgeArgs),
    /// Print row counts per table.
    Stats(StatsArgs),
}

/// Database settings shared by every command once layers are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DatabaseConfig {
    path: Utf8PathBuf,
    index: IndexConfig,
}

impl DatabaseConfig {
    fn resolve(
        database: Option<Utf8PathBuf>,
        max_records: Option<usize>,
        env: &'static str,
    ) -> Result<Self, CliError> {
        let path = database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env,
        })?;
        let index =
            IndexConfig::default().with_max_records(max_records.unwrap_or(DEFAULT_MAX_RECORDS));
        Ok(Self { path, index })
    }

    /// Open the database, creating its directory and file when missing.
    fn open<R: BboxResolver>(
        &self,
        resolver: R,
    ) -> Result<XapiIndex<SqliteTagIndexStore, R>, CliError> {
        fs::ensure_parent_dir(&self.path).map_err(|source| CliError::PrepareDatabase {
            path: self.path.clone(),
            source,
        })?;
        let store = open_store(&self.path)?;
        log::debug!("opened tag index at {}", self.path);
        Ok(XapiIndex::with_config(store, resolver, self.index))
    }
}

fn open_store(path: &Utf8Path) -> Result<SqliteTagIndexStore, CliError> {
    SqliteTagIndexStore::open(path).map_err(|source| CliError::OpenDatabase {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

fn write_line(writer: &mut dyn Write, line: &str) -> Result<(), CliError> {
    writeln!(writer, "{line}").map_err(CliError::WriteOutput)
}

#[cfg(test)]
mod tests;
