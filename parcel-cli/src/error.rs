//! Error types emitted by the `parcels` CLI.

use std::sync::Arc;

use camino::Utf8PathBuf;
use parcel_core::{StoreError, SyncError};
use parcel_data::{LayerError, SourceBuildError};
use thiserror::Error;

/// Errors emitted by the `parcels` CLI.
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
        field: &'static str,
        env: &'static str,
    },
    /// A zero timeout would fail every request.
    #[error("--{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },
    /// Reading the id list from a file failed.
    #[error("failed to read parcel ids from {path}: {source}")]
    ReadInput {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Reading the id list from standard input failed.
    #[error("failed to read parcel ids from stdin: {0}")]
    ReadStdin(#[source] std::io::Error),
    /// The layer could not be created or opened.
    #[error(transparent)]
    Layer(#[from] LayerError),
    /// Scanning the layer failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Constructing the HTTP source failed.
    #[error(transparent)]
    BuildSource(#[from] SourceBuildError),
    /// The sync run was aborted and nothing was committed.
    #[error(transparent)]
    Sync(#[from] SyncError),
    /// Serialising the sync report failed.
    #[error("failed to serialise sync report: {0}")]
    SerialiseReport(#[source] serde_json::Error),
    /// Writing to standard output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
