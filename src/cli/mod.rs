//! Command-line interface for the `songplay-etl` binary

pub mod commands;
pub mod error;

pub use error::CliError;

/// Default log filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "songplay_warehouse=info";

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins when set; `verbose` raises the crate to debug, which
/// includes the SQL text of every statement.
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "songplay_warehouse=debug"
    } else {
        DEFAULT_LOG_FILTER
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
