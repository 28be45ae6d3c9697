//! Staging loads
//!
//! Bulk-ingests the event log and the song catalog into their staging
//! relations, one copy statement per relation. Each load reads the whole
//! source prefix; a malformed record or a rejected credential fails the
//! statement and the run.

pub mod copy;

pub use copy::{CopySpec, IamRole, JsonFormat};

use crate::database::{Dialect, PipelineConfig, Statement, WarehouseResult};
use crate::models::Relation;
use crate::pipeline::{PipelineError, PipelineResult, StatementExecutor};

/// Loads the staging relations from object storage
#[derive(Debug, Clone)]
pub struct StagingLoader {
    dialect: Dialect,
    specs: Vec<CopySpec>,
}

impl StagingLoader {
    /// Build the events and songs loads from configuration, events first
    pub fn from_config(config: &PipelineConfig, dialect: Dialect) -> Self {
        let credentials = IamRole::new(config.iam_role.role_arn());
        let region = config.s3.region.clone();

        let specs = vec![
            CopySpec {
                relation: Relation::StagingEvents,
                source: config.s3.log_data.clone(),
                credentials: credentials.clone(),
                format: JsonFormat::from_jsonpaths(config.s3.log_jsonpath.as_deref()),
                region: region.clone(),
            },
            CopySpec {
                relation: Relation::StagingSongs,
                source: config.s3.song_data.clone(),
                credentials,
                format: JsonFormat::Auto,
                region,
            },
        ];

        Self { dialect, specs }
    }

    pub fn specs(&self) -> &[CopySpec] {
        &self.specs
    }

    /// Render every load statement in execution order
    pub fn statements(&self) -> WarehouseResult<Vec<Statement>> {
        self.specs.iter().map(|s| s.render(self.dialect)).collect()
    }

    /// Run one bulk load
    pub async fn load_staging(
        &self,
        exec: &mut StatementExecutor<'_>,
        spec: &CopySpec,
    ) -> PipelineResult<u64> {
        let statement = spec
            .render(self.dialect)
            .map_err(|source| PipelineError::BulkLoad {
                relation: spec.relation,
                source,
            })?;

        tracing::info!(relation = %spec.relation, "Loading staging from {}", spec.source);
        exec.run(&statement).await
    }

    /// Load both staging relations, events first
    pub async fn load_all(&self, exec: &mut StatementExecutor<'_>) -> PipelineResult<u64> {
        let mut total = 0;
        for spec in &self.specs {
            total += self.load_staging(exec, spec).await?;
        }
        Ok(total)
    }
}
