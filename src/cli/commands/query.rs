//! SQL query CLI command
//!
//! Runs an ad-hoc query against the configured warehouse.

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::database::{OutputFormat, format_query_result};

use super::{config_dir, load_config, open_backend, runtime};

/// Query command arguments
#[derive(Debug, Clone)]
pub struct QueryArgs {
    /// SQL query to execute
    pub sql: String,
    pub config: PathBuf,
    /// Output format
    pub format: String,
}

/// Execute a SQL query and print the result
pub fn handle_query(args: &QueryArgs) -> Result<(), CliError> {
    let config = load_config(&args.config)?;
    let base_dir = config_dir(&args.config);

    let output_format: OutputFormat = args
        .format
        .parse()
        .map_err(|e: String| CliError::InvalidArgument(e))?;

    let rt = runtime()?;
    rt.block_on(async {
        let backend = open_backend(&config, &base_dir).await?;
        let result = backend.query(&args.sql).await?;

        println!("{}", format_query_result(&result, output_format));

        // Timing goes to stderr so JSON and CSV output stay machine-readable
        if output_format == OutputFormat::Table {
            eprintln!("\nExecution time: {}ms", result.execution_time_ms);
        }

        backend.close().await?;
        Ok::<(), CliError>(())
    })
}
