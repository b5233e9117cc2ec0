//! Tracing setup for the cannon binary

use crate::cli::LogLevel;
use std::io;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber, writing to stderr
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_tracing(level: LogLevel, json: bool) -> miette::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            let level = level.as_str();
            EnvFilter::try_new(format!(
                "cannon={level},cannon_gateway={level},cannon_admission={level},cannon_fingerprint={level}"
            ))
        })
        .map_err(|e| miette::miette!("Failed to create tracing filter: {e}"))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_current_span(true),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(io::stderr)
                    .with_target(false),
            )
            .try_init()
    };
    result.map_err(|e| miette::miette!("Failed to install tracing subscriber: {e}"))
}
