//! # refineloop-logging
//!
//! Progress reporting for refineloop runs, on two channels:
//!
//! - [`Logger`] renders each [`LogEvent`] (round started, scores, retries,
//!   temperature changes, termination) to stderr as `pretty` colored blocks,
//!   `compact` one-liners or `json` lines, and can also append every event to
//!   a JSONL file with an RFC 3339 `timestamp` field.
//! - [`init_tracing`] installs the `tracing` subscriber for library
//!   diagnostics, filtered by `RUST_LOG` when set and written to stderr as
//!   text or JSON.
//!
//! Neither channel touches stdout, which carries only the final text or the
//! JSON result.

mod events;

pub use events::{LogEvent, LogFormat, Logger, ModelRole};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing for the application
pub fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        LogFormat::Pretty | LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .init();
        }
    }
}
