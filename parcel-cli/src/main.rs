//! Entry point for the `parcels` command-line interface.
#![forbid(unsafe_code)]

use parcel_cli::CliError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter, e.g. `debug` or `parcel_core=info`.
const LOG_ENV: &str = "PARCELS_LOG";

fn main() {
    init_logging();
    match parcel_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("parcels: {err}");
            std::process::exit(1);
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
    if let Err(err) = installed {
        eprintln!("parcels: logging disabled: {err}");
    }
}
