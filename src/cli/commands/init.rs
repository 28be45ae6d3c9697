//! Write a sample configuration file

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::database::config::sample_config;

/// Init-config command arguments
#[derive(Debug, Clone)]
pub struct InitArgs {
    pub path: PathBuf,
    /// Overwrite an existing file
    pub force: bool,
}

pub fn handle_init_config(args: &InitArgs) -> Result<(), CliError> {
    if args.path.exists() && !args.force {
        return Err(CliError::ConfigExists(args.path.clone()));
    }

    std::fs::write(&args.path, sample_config()).map_err(|e| {
        CliError::IoError(format!("Failed to write {}: {}", args.path.display(), e))
    })?;

    println!("Wrote {}", args.path.display());
    Ok(())
}
