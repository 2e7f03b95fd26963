//! `init` and `list` commands operating on the layer alone.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use parcel_core::existing_parcel_ids;
use parcel_data::SqlitePolygonLayer;
use serde::{Deserialize, Serialize};

use crate::{
    ARG_DATABASE, ARG_LAYER, CliError, DEFAULT_LAYER, ENV_INIT_DATABASE, ENV_LIST_DATABASE,
};

/// CLI arguments for the `init` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "init",
    about = "Create the parcel layer if it does not exist",
    long_about = "Create the SQLite database and the parcel layer table. \
                  Running it against an existing layer is a no-op."
)]
#[ortho_config(prefix = "PARCELS")]
pub(crate) struct InitArgs {
    /// Path to the SQLite database holding the layer.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Name of the layer table.
    #[arg(long = ARG_LAYER, value_name = "name")]
    #[serde(default)]
    pub(crate) layer: Option<String>,
}

/// CLI arguments for the `list` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "list",
    about = "Print the parcel id of every feature in the layer",
    long_about = "Print one parcel id per line in layer order, skipping \
                  features without an id. The output can be edited and fed \
                  back to `parcels sync`."
)]
#[ortho_config(prefix = "PARCELS")]
pub(crate) struct ListArgs {
    /// Path to the SQLite database holding the layer.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Name of the layer table.
    #[arg(long = ARG_LAYER, value_name = "name")]
    #[serde(default)]
    pub(crate) layer: Option<String>,
}

/// Resolved location of a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LayerConfig {
    /// SQLite database path.
    pub(crate) database: Utf8PathBuf,
    /// Layer table name.
    pub(crate) layer: String,
}

impl LayerConfig {
    pub(crate) fn resolve(
        database: Option<Utf8PathBuf>,
        layer: Option<String>,
        env: &'static str,
    ) -> Result<Self, CliError> {
        let database = database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env,
        })?;
        Ok(Self {
            database,
            layer: layer.unwrap_or_else(|| DEFAULT_LAYER.to_owned()),
        })
    }
}

impl TryFrom<InitArgs> for LayerConfig {
    type Error = CliError;

    fn try_from(args: InitArgs) -> Result<Self, Self::Error> {
        Self::resolve(args.database, args.layer, ENV_INIT_DATABASE)
    }
}

impl TryFrom<ListArgs> for LayerConfig {
    type Error = CliError;

    fn try_from(args: ListArgs) -> Result<Self, Self::Error> {
        Self::resolve(args.database, args.layer, ENV_LIST_DATABASE)
    }
}

pub(crate) fn run_init(args: InitArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    init_layer(&LayerConfig::try_from(merged)?, writer)
}

pub(crate) fn run_list(args: ListArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    list_layer(&LayerConfig::try_from(merged)?, writer)
}

pub(crate) fn init_layer(config: &LayerConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let layer = SqlitePolygonLayer::create(&config.database, &config.layer)?;
    let count = layer.feature_count()?;
    info!("layer {:?} holds {count} feature(s)", config.layer);
    writeln!(
        writer,
        "layer {:?} ready in {} ({count} feature(s))",
        config.layer, config.database
    )
    .map_err(CliError::WriteOutput)
}

pub(crate) fn list_layer(config: &LayerConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let layer = SqlitePolygonLayer::open(&config.database, &config.layer)?;
    for id in existing_parcel_ids(&layer)? {
        writeln!(writer, "{id}").map_err(CliError::WriteOutput)?;
    }
    Ok(())
}
