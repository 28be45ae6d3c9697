//! Print the statements of a full pass without executing them

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::database::{Dialect, PipelineConfig};
use crate::pipeline::full_pass_statements;

use super::load_config;

/// Sql command arguments
#[derive(Debug, Clone)]
pub struct SqlArgs {
    pub config: PathBuf,
    /// Dialect to render; defaults to the configured backend's
    pub dialect: Option<String>,
}

pub fn handle_sql(args: &SqlArgs) -> Result<(), CliError> {
    // The defaults are enough to render statements, so a missing file is fine
    let config = if args.config.exists() {
        load_config(&args.config)?
    } else {
        PipelineConfig::new()
    };

    let dialect = match &args.dialect {
        Some(name) => name
            .parse::<Dialect>()
            .map_err(CliError::InvalidArgument)?,
        None => config.dialect(),
    };

    println!("{}", render_script(&config, dialect)?);
    Ok(())
}

/// All statements of a full pass as one script, each with a header comment
pub fn render_script(config: &PipelineConfig, dialect: Dialect) -> Result<String, CliError> {
    let statements = full_pass_statements(config, dialect)?;

    Ok(statements
        .iter()
        .map(|s| format!("-- {} {}\n{}", s.kind, s.relation, s))
        .collect::<Vec<_>>()
        .join("\n\n"))
}
