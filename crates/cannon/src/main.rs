//! cannon CLI application

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

use cannon::cli::{Cli, Commands, EXIT_CLI, EXIT_OK, EXIT_RATE_LIMITED, EXIT_UNAVAILABLE};
use cannon::commands;
use cannon::logging::init_tracing;
use clap::Parser;
use miette::Report;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.level, cli.json) {
        eprintln!("{e:?}");
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            return ExitCode::from(EXIT_CLI);
        }
    };

    match rt.block_on(execute(cli)) {
        Ok(code) => ExitCode::from(code),
        Err(report) => {
            eprintln!("{report:?}");
            ExitCode::from(exit_code_for_error(&report))
        }
    }
}

async fn execute(cli: Cli) -> miette::Result<u8> {
    match cli.command {
        Commands::Fingerprint(args) => {
            let report = commands::fingerprint(&args)?;
            if cli.json {
                print_json(&report)?;
            } else {
                println!("{}", report.fingerprint);
            }
            Ok(EXIT_OK)
        }
        Commands::Run(args) => {
            let outcome = commands::run(&args).await?;
            if cli.json {
                print_json(&outcome)?;
            } else {
                for line in outcome.output.transcript() {
                    print!("{line}");
                }
            }
            tracing::info!(
                fingerprint = %outcome.fingerprint,
                cached = outcome.is_cached(),
                "Request finished"
            );
            Ok(commands::exit_code_for(&outcome))
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> miette::Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| miette::miette!("Failed to serialize output: {e}"))?;
    println!("{text}");
    Ok(())
}

fn exit_code_for_error(report: &Report) -> u8 {
    match report.downcast_ref::<cannon_gateway::Error>() {
        Some(cannon_gateway::Error::RateLimited { .. }) => EXIT_RATE_LIMITED,
        Some(err) if err.is_retryable() => EXIT_UNAVAILABLE,
        _ => EXIT_CLI,
    }
}
