//! Error types emitted by the `xapi-index` CLI.
//!
//! Keep this error type reasonably small, as every command returns
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;
use xapi_index_core::{IndexError, StoreError, UnknownElementType};

/// Errors emitted by the `xapi-index` CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Name of the missing option.
        field: &'static str,
        /// Environment variable that can supply the option.
        env: &'static str,
    },
    /// The `--type` filter names no element type.
    #[error("invalid --type filter: {0}")]
    InvalidElementType(#[from] UnknownElementType),
    /// The `--bbox` filter is not four comma-separated numbers.
    #[error("invalid --bbox {value:?}: expected minlon,minlat,maxlon,maxlat")]
    InvalidBbox {
        /// The rejected `--bbox` value.
        value: String,
    },
    /// Opening an element file failed.
    #[error("failed to open element file {path:?}: {source}")]
    OpenElements {
        /// Path involved in the failed operation.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// An element file is not a JSON array of elements.
    #[error("failed to parse element file {path:?}: {source}")]
    ParseElements {
        /// Path involved in the failed operation.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// Creating the directory that holds the database failed.
    #[error("failed to prepare database directory for {path:?}: {source}")]
    PrepareDatabase {
        /// Path involved in the failed operation.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open tag index at {path:?}: {source}")]
    OpenDatabase {
        /// Path involved in the failed operation.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: Box<StoreError>,
    },
    /// An index operation failed.
    #[error(transparent)]
    Index(#[from] IndexError),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
