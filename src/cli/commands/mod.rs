//! CLI command implementations

pub mod init;
pub mod query;
pub mod run;
pub mod sql;
pub mod status;

use std::path::{Path, PathBuf};

use crate::cli::error::CliError;
use crate::database::{BackendType, PipelineConfig, WarehouseBackend};

/// Read the configuration file, with environment overrides applied
pub fn load_config(path: &Path) -> Result<PipelineConfig, CliError> {
    if !path.exists() {
        return Err(CliError::ConfigNotFound(path.to_path_buf()));
    }

    Ok(PipelineConfig::load(path)?)
}

/// Directory relative paths in the configuration resolve against
pub fn config_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Open a session on the configured warehouse
pub async fn open_backend(
    config: &PipelineConfig,
    base_dir: &Path,
) -> Result<Box<dyn WarehouseBackend>, CliError> {
    match config.warehouse.backend {
        BackendType::DuckDB => {
            #[cfg(feature = "duckdb-backend")]
            {
                let db_path = config.get_duckdb_path(base_dir);
                tracing::info!("Opening DuckDB warehouse at {}", db_path.display());
                let backend = crate::database::DuckDbBackend::new(&db_path)
                    .map_err(crate::pipeline::PipelineError::Connectivity)?;
                Ok(Box::new(backend))
            }
            #[cfg(not(feature = "duckdb-backend"))]
            {
                let _ = base_dir;
                Err(CliError::InvalidArgument(
                    "DuckDB backend not enabled. Build with --features duckdb-backend".to_string(),
                ))
            }
        }
        BackendType::Redshift => {
            #[cfg(feature = "redshift-backend")]
            {
                tracing::info!("Connecting to Redshift at {}", config.cluster.describe());
                let backend = crate::database::RedshiftBackend::connect(&config.cluster)
                    .await
                    .map_err(crate::pipeline::PipelineError::Connectivity)?;
                Ok(Box::new(backend))
            }
            #[cfg(not(feature = "redshift-backend"))]
            {
                Err(CliError::InvalidArgument(
                    "Redshift backend not enabled. Build with --features redshift-backend"
                        .to_string(),
                ))
            }
        }
    }
}

/// Build the runtime commands block on
pub fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::IoError(format!("Failed to create runtime: {}", e)))
}
