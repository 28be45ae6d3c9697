//! Songplay warehouse - loads play-event logs and a song catalog into a star schema
//!
//! Provides:
//! - Relation catalogue for the staging tables and the star schema
//! - Schema reset (drop then create every relation)
//! - Bulk loads from object storage into staging
//! - Insert-select transforms into the fact and dimension tables
//! - A sequential orchestrator over a Redshift or DuckDB backend
//!
//! ```no_run
//! # #[cfg(feature = "duckdb-backend")]
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use songplay_warehouse::{DuckDbBackend, PipelineConfig, PipelineOrchestrator};
//!
//! let config = PipelineConfig::duckdb(":memory:", "data/log_data/*.json", "data/song_data/*.json");
//! let backend = DuckDbBackend::in_memory()?;
//! let report = PipelineOrchestrator::new(&config, &backend)?.run().await?;
//! println!("{} rows", report.total_rows());
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod database;
pub mod models;
pub mod pipeline;
pub mod schema;
pub mod staging;
pub mod transform;
pub mod validation;

pub use database::{
    BackendType, Dialect, PipelineConfig, QueryResult, Statement, StatementKind, WarehouseBackend,
    WarehouseError, WarehouseResult,
};
#[cfg(feature = "duckdb-backend")]
pub use database::DuckDbBackend;
#[cfg(feature = "redshift-backend")]
pub use database::RedshiftBackend;
pub use models::{ColumnDef, ColumnType, Relation, RelationKind};
pub use pipeline::{
    PipelineError, PipelineOrchestrator, PipelineResult, PipelineStage, PipelineState, RunReport,
};
pub use schema::SchemaManager;
pub use staging::{CopySpec, IamRole, JsonFormat, StagingLoader};
pub use transform::{Dimension, TimeParts, Transformer};
