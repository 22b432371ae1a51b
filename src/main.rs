// ABOUTME: Entry point for the rollover CLI application.
// ABOUTME: Parses arguments, runs the upgrade, and maps its outcome to an exit code.

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use rollover::output::{Output, OutputMode};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Normal
    };
    let mut output = Output::new(mode);

    match commands::upgrade(&cli, &mut output).await {
        Ok(outcome) => {
            output.outcome(&outcome);
            ExitCode::from(outcome.exit_code())
        }
        Err(e) => {
            output.error(&e.to_string());
            ExitCode::from(e.exit_code())
        }
    }
}
