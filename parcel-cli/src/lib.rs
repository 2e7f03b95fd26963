//! Command-line interface for keeping a SQLite parcel layer in sync with a
//! list of cadastral parcel ids.
#![forbid(unsafe_code)]

mod error;
mod layer;
mod sync;

use clap::{Parser, Subcommand};

pub use error::CliError;

use layer::{InitArgs, ListArgs};
use sync::SyncArgs;

pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ARG_LAYER: &str = "layer";
pub(crate) const ARG_PLACE: &str = "place";
pub(crate) const ARG_CRS: &str = "crs";
pub(crate) const ARG_BASE_URL: &str = "base-url";
pub(crate) const ARG_TIMEOUT_SECS: &str = "timeout-secs";
pub(crate) const ENV_INIT_DATABASE: &str = "PARCELS_CMDS_INIT_DATABASE";
pub(crate) const ENV_LIST_DATABASE: &str = "PARCELS_CMDS_LIST_DATABASE";
pub(crate) const ENV_SYNC_DATABASE: &str = "PARCELS_CMDS_SYNC_DATABASE";
pub(crate) const ENV_SYNC_PLACE: &str = "PARCELS_CMDS_SYNC_PLACE";
pub(crate) const ENV_SYNC_CRS: &str = "PARCELS_CMDS_SYNC_CRS";

/// Layer used when none is configured.
pub const DEFAULT_LAYER: &str = "parcels";

/// Run the CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] for invalid arguments and for any failure that
/// aborts the command. Per-parcel sync failures are part of the printed
/// report instead.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Init(args) => layer::run_init(args, &mut stdout),
        Command::List(args) => layer::run_list(args, &mut stdout),
        Command::Sync(args) => sync::run_sync(args, &mut stdout),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "parcels",
    about = "Keep a parcel polygon layer in sync with a list of cadastral parcel ids",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the parcel layer if it does not exist.
    Init(InitArgs),
    /// Print the parcel id of every feature in the layer.
    List(ListArgs),
    /// Add missing parcels and remove stale ones.
    Sync(SyncArgs),
}

#[cfg(test)]
mod tests;
