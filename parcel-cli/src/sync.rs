//! `sync` command: reconcile the layer with an id list and print the report.

use std::io::{Read, Write};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use parcel_core::{
    DEFAULT_BASE_URL, ParcelSource, ParcelSync, ServiceConfig, SyncReport, split_input,
};
use parcel_data::{HttpParcelSource, HttpParcelSourceConfig, SqlitePolygonLayer};
use serde::{Deserialize, Serialize};

use crate::layer::LayerConfig;
use crate::{
    ARG_BASE_URL, ARG_CRS, ARG_DATABASE, ARG_LAYER, ARG_PLACE, ARG_TIMEOUT_SECS, CliError,
    ENV_SYNC_CRS, ENV_SYNC_DATABASE, ENV_SYNC_PLACE,
};

/// Input path that selects standard input.
const STDIN_MARKER: &str = "-";

/// CLI arguments for the `sync` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "sync",
    about = "Add missing parcels and remove stale ones",
    long_about = "Read parcel ids (one `<region>-<suffix>` per line) from a \
                  file or standard input, fetch the geometry of every id \
                  missing from the layer, delete features whose id is no \
                  longer listed, and print a JSON report. Parcels that fail \
                  are listed in the report; the command only fails when \
                  nothing could be committed."
)]
#[ortho_config(prefix = "PARCELS")]
pub(crate) struct SyncArgs {
    /// File with one parcel id per line; `-` or nothing reads stdin.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) input: Option<Utf8PathBuf>,
    /// Path to the SQLite database holding the layer.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Name of the layer table.
    #[arg(long = ARG_LAYER, value_name = "name")]
    #[serde(default)]
    pub(crate) layer: Option<String>,
    /// Place (commune) identifier prepended to every parcel, e.g. "141201_1".
    #[arg(long = ARG_PLACE, value_name = "id")]
    #[serde(default)]
    pub(crate) place: Option<String>,
    /// EPSG code of the stored geometry, e.g. "2180".
    #[arg(long = ARG_CRS, value_name = "epsg")]
    #[serde(default)]
    pub(crate) crs: Option<String>,
    /// Root URL of the lookup service.
    #[arg(long = ARG_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) base_url: Option<String>,
    /// Per-request timeout; unset waits indefinitely.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "seconds")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
}

impl SyncArgs {
    pub(crate) fn into_config(self) -> Result<SyncConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SyncConfig::try_from(merged)
    }
}

/// Resolved `sync` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyncConfig {
    /// Id list path; `None` reads stdin.
    pub(crate) input: Option<Utf8PathBuf>,
    /// Layer to synchronise.
    pub(crate) layer: LayerConfig,
    /// Lookup service parameters.
    pub(crate) service: ServiceConfig,
    /// Per-request timeout.
    pub(crate) timeout: Option<Duration>,
}

impl TryFrom<SyncArgs> for SyncConfig {
    type Error = CliError;

    fn try_from(args: SyncArgs) -> Result<Self, Self::Error> {
        let layer = LayerConfig::resolve(args.database, args.layer, ENV_SYNC_DATABASE)?;
        let place = args.place.ok_or(CliError::MissingArgument {
            field: ARG_PLACE,
            env: ENV_SYNC_PLACE,
        })?;
        let crs = args.crs.ok_or(CliError::MissingArgument {
            field: ARG_CRS,
            env: ENV_SYNC_CRS,
        })?;
        let timeout = match args.timeout_secs {
            Some(0) => {
                return Err(CliError::ZeroTimeout {
                    field: ARG_TIMEOUT_SECS,
                });
            }
            other => other.map(Duration::from_secs),
        };
        let input = args
            .input
            .filter(|path| path.as_str() != STDIN_MARKER);
        let service = ServiceConfig::new(place, crs)
            .with_base_url(args.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()));
        Ok(Self {
            input,
            layer,
            service,
            timeout,
        })
    }
}

/// Builds the [`ParcelSource`] used by a sync run.
pub(crate) trait SyncSourceBuilder {
    fn build(&self, config: &SyncConfig) -> Result<Box<dyn ParcelSource>, CliError>;
}

/// Production builder returning an [`HttpParcelSource`].
#[derive(Debug, Default)]
pub(crate) struct HttpSourceBuilder;

impl SyncSourceBuilder for HttpSourceBuilder {
    fn build(&self, config: &SyncConfig) -> Result<Box<dyn ParcelSource>, CliError> {
        let mut source_config = HttpParcelSourceConfig::default();
        if let Some(timeout) = config.timeout {
            source_config = source_config.with_timeout(timeout);
        }
        Ok(Box::new(HttpParcelSource::with_config(source_config)?))
    }
}

pub(crate) fn run_sync(args: SyncArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let mut stdin = std::io::stdin().lock();
    run_sync_with(args, &HttpSourceBuilder, &mut stdin, writer)
}

pub(crate) fn run_sync_with(
    args: SyncArgs,
    builder: &dyn SyncSourceBuilder,
    stdin: &mut dyn Read,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let report = execute_sync(&config, builder, stdin)?;
    write_report(writer, &report)
}

pub(crate) fn execute_sync(
    config: &SyncConfig,
    builder: &dyn SyncSourceBuilder,
    stdin: &mut dyn Read,
) -> Result<SyncReport, CliError> {
    let text = match &config.input {
        Some(path) => read_input(path)?,
        None => {
            let mut text = String::new();
            stdin
                .read_to_string(&mut text)
                .map_err(CliError::ReadStdin)?;
            text
        }
    };
    let ids = split_input(&text);
    let mut layer = SqlitePolygonLayer::open(&config.layer.database, &config.layer.layer)?;
    let source = builder.build(config)?;
    let report = ParcelSync::new(source, config.service.clone()).sync(&ids, &mut layer)?;
    info!(
        "{} added, {} deleted, {} unchanged, {} failed",
        report.added.len(),
        report.deleted.len(),
        report.unchanged.len(),
        report.failures.len()
    );
    Ok(report)
}

fn read_input(path: &Utf8Path) -> Result<String, CliError> {
    parcel_fs::read_utf8_file(path).map_err(|source| CliError::ReadInput {
        path: path.to_path_buf(),
        source,
    })
}

fn write_report(writer: &mut dyn Write, report: &SyncReport) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(report).map_err(CliError::SerialiseReport)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}
