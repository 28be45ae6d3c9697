//! CLI-specific error types

use std::path::PathBuf;
use thiserror::Error;

use crate::database::WarehouseError;
use crate::pipeline::PipelineError;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Config file not found: {0}. Run 'songplay-etl init-config' to create one.")]
    ConfigNotFound(PathBuf),

    #[error("Config file already exists: {0}")]
    ConfigExists(PathBuf),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] WarehouseError),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),
}
