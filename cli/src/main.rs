//! A3S ACI CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use a3s_aci_cli::commands::{dispatch, Cli};
use a3s_aci_core::{BuildConfig, LogLevel};

fn main() {
    let cli = Cli::parse();
    let debug = cli.debug || BuildConfig::debug_from_env();

    // Initialize tracing
    let default_level = if debug { LogLevel::Debug } else { LogLevel::Warn };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dispatch(cli, debug) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
