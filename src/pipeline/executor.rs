//! Logged, one-at-a-time statement execution

use serde::Serialize;
use std::time::Instant;

use super::error::{PipelineError, PipelineResult};
use crate::database::{Dialect, Statement, StatementKind, WarehouseBackend};
use crate::models::Relation;

/// Record of one committed statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementOutcome {
    pub relation: Relation,
    pub kind: StatementKind,
    /// Rows affected as reported by the warehouse (0 for DDL)
    pub rows_affected: u64,
    pub elapsed_ms: u64,
}

/// Runs statements against a backend, in order, awaiting each before the next
///
/// Every statement is its own committed unit. The first failure is returned
/// as a [`PipelineError`] classified by the statement's kind; nothing after it
/// runs.
pub struct StatementExecutor<'a> {
    backend: &'a dyn WarehouseBackend,
    outcomes: Vec<StatementOutcome>,
}

impl<'a> StatementExecutor<'a> {
    pub fn new(backend: &'a dyn WarehouseBackend) -> Self {
        Self {
            backend,
            outcomes: Vec::new(),
        }
    }

    /// Dialect statements must be rendered in for the wrapped backend
    pub fn dialect(&self) -> Dialect {
        self.backend.dialect()
    }

    pub fn backend(&self) -> &'a dyn WarehouseBackend {
        self.backend
    }

    /// Execute a single statement and record its outcome
    pub async fn run(&mut self, statement: &Statement) -> PipelineResult<u64> {
        tracing::info!(
            relation = %statement.relation,
            kind = %statement.kind,
            "Executing statement"
        );
        tracing::debug!("{}", statement);

        let start = Instant::now();
        match self.backend.execute(statement).await {
            Ok(rows_affected) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                tracing::info!(
                    relation = %statement.relation,
                    kind = %statement.kind,
                    rows_affected,
                    elapsed_ms,
                    "Statement committed"
                );
                self.outcomes.push(StatementOutcome {
                    relation: statement.relation,
                    kind: statement.kind,
                    rows_affected,
                    elapsed_ms,
                });
                Ok(rows_affected)
            }
            Err(e) => {
                tracing::error!(
                    relation = %statement.relation,
                    kind = %statement.kind,
                    "Statement failed: {}",
                    e
                );
                Err(PipelineError::from_statement(
                    statement.relation,
                    statement.kind,
                    e,
                ))
            }
        }
    }

    /// Execute statements in order, stopping at the first failure
    ///
    /// # Returns
    /// Total rows affected
    pub async fn run_all(&mut self, statements: &[Statement]) -> PipelineResult<u64> {
        let mut total = 0;
        for statement in statements {
            total += self.run(statement).await?;
        }
        Ok(total)
    }

    /// Outcomes of every statement committed so far
    pub fn outcomes(&self) -> &[StatementOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<StatementOutcome> {
        self.outcomes
    }
}
