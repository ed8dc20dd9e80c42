//! storecopy entry point.

mod app;
mod cli;
mod config;

use std::process::ExitCode;

use clap::Parser;
use storecopy_initiator::Outcome;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::Config;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize structured logging.
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting storecopy");

    match run(&cli) {
        Ok(outcome) => {
            println!("{outcome}");
            ExitCode::from(exit_code(&outcome))
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<Outcome> {
    let request = cli.transfer_request()?;

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_cli(cli);
    tracing::info!(
        root = %config.storage_root.display(),
        responder = %config.responder_name,
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config, request))
}

/// 0 on success, 2 when no message could be sent, 1 for any other failure.
fn exit_code(outcome: &Outcome) -> u8 {
    if outcome.is_success() {
        0
    } else if outcome.is_setup_failure() {
        2
    } else {
        1
    }
}
