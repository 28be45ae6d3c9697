//! Schema management
//!
//! Materializes the two staging relations and the five star-schema relations.
//! A reset drops every relation and creates it again, so it can run any number
//! of times against any prior state, including an empty database.

pub mod ddl;

use serde::Serialize;

use crate::database::{
    Dialect, QueryResult, Statement, WarehouseBackend, WarehouseError, WarehouseResult,
};
use crate::models::Relation;
use crate::pipeline::{PipelineResult, StatementExecutor};

/// Row count of one relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationCount {
    pub relation: Relation,
    pub rows: u64,
}

/// Drops and creates warehouse relations
#[derive(Debug, Clone, Copy)]
pub struct SchemaManager {
    dialect: Dialect,
}

impl SchemaManager {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Drop statements for every relation in [`Relation::ALL`] order
    pub fn drop_statements(&self) -> Vec<Statement> {
        Relation::ALL
            .into_iter()
            .flat_map(|r| ddl::drop_statements(r, self.dialect))
            .collect()
    }

    /// Create statements for every relation in [`Relation::ALL`] order
    pub fn create_statements(&self) -> Vec<Statement> {
        Relation::ALL
            .into_iter()
            .flat_map(|r| ddl::create_statements(r, self.dialect))
            .collect()
    }

    /// Drop every relation; relations that do not exist are skipped
    pub async fn drop_all(&self, exec: &mut StatementExecutor<'_>) -> PipelineResult<()> {
        tracing::info!("Dropping {} relations", Relation::ALL.len());
        exec.run_all(&self.drop_statements()).await?;
        Ok(())
    }

    /// Create every relation
    pub async fn create_all(&self, exec: &mut StatementExecutor<'_>) -> PipelineResult<()> {
        tracing::info!("Creating {} relations", Relation::ALL.len());
        exec.run_all(&self.create_statements()).await?;
        Ok(())
    }

    /// Drop then create every relation, leaving them all present and empty
    pub async fn reset(&self, exec: &mut StatementExecutor<'_>) -> PipelineResult<()> {
        self.drop_all(exec).await?;
        self.create_all(exec).await
    }

    /// Count the rows of every relation
    pub async fn row_counts(
        &self,
        backend: &dyn WarehouseBackend,
    ) -> WarehouseResult<Vec<RelationCount>> {
        self.row_counts_of(backend, &Relation::ALL).await
    }

    /// Count the rows of `relations`, in the order given
    pub async fn row_counts_of(
        &self,
        backend: &dyn WarehouseBackend,
        relations: &[Relation],
    ) -> WarehouseResult<Vec<RelationCount>> {
        let mut counts = Vec::with_capacity(relations.len());

        for &relation in relations {
            let result = backend
                .query(&format!(
                    "SELECT COUNT(*) AS row_count FROM {}",
                    relation.ident()
                ))
                .await?;
            counts.push(RelationCount {
                relation,
                rows: count_from_result(relation, &result)?,
            });
        }

        Ok(counts)
    }
}

fn count_from_result(relation: Relation, result: &QueryResult) -> WarehouseResult<u64> {
    result
        .first_i64("row_count")
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| {
            WarehouseError::QueryFailed(format!(
                "Row count of {} missing or malformed: {:?}",
                relation,
                result.rows.first()
            ))
        })
}
