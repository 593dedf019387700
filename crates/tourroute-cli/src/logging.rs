//! Tracing setup for the CLI.
//!
//! Logs always go to stderr so stdout stays clean for route output. The
//! filter comes from `RUST_LOG` and falls back to `info`.

use std::io;

use clap::ValueEnum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Directive used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Install the global subscriber. Later calls are ignored.
pub fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let registry = tracing_subscriber::registry().with(filter);

    let _ = match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(io::stderr),
            )
            .try_init(),
    };
}
