pub mod cli;
pub mod logging_system;
pub mod shutdown;

pub use cli::{Args, LogFormat, LogLevel};
pub use logging_system::{LoggingError, init_logging};
pub use shutdown::shutdown_signal;

use crate::config::Config;
use crate::gateway::Gateway;
use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};

/// Loads configuration, runs the gateway until a termination signal, then
/// closes it.
pub async fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::load(&args.config_file_path).with_context(|| {
        format!(
            "failed to load configuration from {}",
            args.config_file_path.display()
        )
    })?;

    info!(
        "Starting influx-gateway v{} with {}",
        crate::VERSION,
        args.config_file_path.display()
    );

    let mut gateway = Gateway::new(&config).context("failed to create gateway")?;
    gateway.open().await.context("failed to open gateway")?;

    shutdown_signal().await;

    let report = gateway.close().await.context("gateway shutdown failed")?;
    info!(
        services = report.attempted.len(),
        failures = report.failures.len(),
        drained = report.drained,
        "influx-gateway stopped"
    );
    Ok(())
}

pub async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(args.log_level, args.log_format) {
        eprintln!("influx-gateway: {e}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
