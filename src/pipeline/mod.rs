//! Pipeline orchestration
//!
//! Sequences the schema reset, the staging loads and the transform over one
//! warehouse session. Statements run one at a time and each commits on its
//! own; the first failure stops the run and leaves earlier work committed.

pub mod error;
pub mod executor;
pub mod state;

pub use error::{PipelineError, PipelineResult};
pub use executor::{StatementExecutor, StatementOutcome};
pub use state::{PipelineStage, PipelineState};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use uuid::Uuid;

use crate::database::{Dialect, PipelineConfig, Statement, WarehouseBackend, WarehouseError};
use crate::schema::SchemaManager;
use crate::staging::StagingLoader;
use crate::transform::Transformer;

/// Summary of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub final_state: PipelineState,
    pub outcomes: Vec<StatementOutcome>,
    pub duration_ms: u64,
}

impl RunReport {
    /// Rows affected across all statements of the run
    pub fn total_rows(&self) -> u64 {
        self.outcomes.iter().map(|o| o.rows_affected).sum()
    }
}

/// Every statement of a full pass, in execution order, without running any
pub fn full_pass_statements(
    config: &PipelineConfig,
    dialect: Dialect,
) -> PipelineResult<Vec<Statement>> {
    let schema = SchemaManager::new(dialect);
    let loader = StagingLoader::from_config(config, dialect);
    let transformer = Transformer::new(dialect);

    let mut statements = schema.drop_statements();
    statements.extend(schema.create_statements());
    statements.extend(loader.statements()?);
    statements.extend(transformer.statements());
    Ok(statements)
}

/// Drives one pass of the pipeline over a backend
pub struct PipelineOrchestrator<'a> {
    run_id: Uuid,
    backend: &'a dyn WarehouseBackend,
    executor: StatementExecutor<'a>,
    schema: SchemaManager,
    loader: StagingLoader,
    transformer: Transformer,
    state: PipelineState,
}

impl<'a> PipelineOrchestrator<'a> {
    /// Prepare a run
    ///
    /// Validates the configuration and renders the load statements up front,
    /// so bad input fails before anything touches the warehouse.
    pub fn new(config: &PipelineConfig, backend: &'a dyn WarehouseBackend) -> PipelineResult<Self> {
        config.validate()?;

        let dialect = backend.dialect();
        let loader = StagingLoader::from_config(config, dialect);
        loader.statements()?;

        Ok(Self {
            run_id: Uuid::new_v4(),
            backend,
            executor: StatementExecutor::new(backend),
            schema: SchemaManager::new(dialect),
            loader,
            transformer: Transformer::new(dialect),
            state: PipelineState::Init,
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Statements committed so far, including those before a failure
    pub fn outcomes(&self) -> &[StatementOutcome] {
        self.executor.outcomes()
    }

    /// Full pass: reset the schema, load staging, populate the star schema
    pub async fn run(&mut self) -> PipelineResult<RunReport> {
        let (started_at, clock) = self.begin("full pass")?;

        self.check_connectivity().await?;
        self.reset_schema().await?;
        self.load_staging().await?;
        self.transform().await?;
        self.transition(PipelineState::Done)?;

        Ok(self.report(started_at, clock))
    }

    /// Reset the schema only
    pub async fn create_tables(&mut self) -> PipelineResult<RunReport> {
        let (started_at, clock) = self.begin("create tables")?;

        self.check_connectivity().await?;
        self.reset_schema().await?;
        self.transition(PipelineState::Done)?;

        Ok(self.report(started_at, clock))
    }

    /// Load staging and transform against the existing schema
    ///
    /// Nothing is cleared first, so repeating this appends every row again.
    pub async fn load_and_transform(&mut self) -> PipelineResult<RunReport> {
        let (started_at, clock) = self.begin("load and transform")?;

        self.check_connectivity().await?;
        self.load_staging().await?;
        self.transform().await?;
        self.transition(PipelineState::Done)?;

        Ok(self.report(started_at, clock))
    }

    fn begin(&self, label: &str) -> PipelineResult<(DateTime<Utc>, Instant)> {
        if self.state != PipelineState::Init {
            return Err(PipelineError::AlreadyRun(self.state));
        }

        tracing::info!(
            run_id = %self.run_id,
            backend = self.backend.backend_type(),
            "Starting pipeline: {}",
            label
        );
        Ok((Utc::now(), Instant::now()))
    }

    async fn check_connectivity(&mut self) -> PipelineResult<()> {
        let result = match self.backend.health_check().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(PipelineError::Connectivity(WarehouseError::ConnectionFailed(
                "health check returned no rows".to_string(),
            ))),
            Err(e) => Err(PipelineError::Connectivity(e)),
        };
        self.settle(result, PipelineStage::Connect, None)
    }

    async fn reset_schema(&mut self) -> PipelineResult<()> {
        let result = self.schema.reset(&mut self.executor).await;
        self.settle(
            result,
            PipelineStage::SchemaReset,
            Some(PipelineState::SchemaReset),
        )
    }

    async fn load_staging(&mut self) -> PipelineResult<()> {
        let result = self.loader.load_all(&mut self.executor).await;
        self.settle(
            result.map(|rows| {
                tracing::info!("Staging loaded: {} rows", rows);
            }),
            PipelineStage::StagingLoad,
            Some(PipelineState::StagingLoaded),
        )
    }

    async fn transform(&mut self) -> PipelineResult<()> {
        let result = self.transformer.populate_all(&mut self.executor).await;
        self.settle(
            result.map(|rows| {
                tracing::info!("Star schema populated: {} rows", rows);
            }),
            PipelineStage::Transform,
            Some(PipelineState::Transformed),
        )
    }

    /// Advance on success, or record the failed stage
    fn settle(
        &mut self,
        result: PipelineResult<()>,
        stage: PipelineStage,
        next: Option<PipelineState>,
    ) -> PipelineResult<()> {
        match result {
            Ok(()) => match next {
                Some(next) => self.transition(next),
                None => Ok(()),
            },
            Err(e) => {
                tracing::error!(run_id = %self.run_id, "Pipeline failed during {}: {}", stage, e);
                self.transition(PipelineState::Failed { stage })?;
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: PipelineState) -> PipelineResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        tracing::debug!(run_id = %self.run_id, "Pipeline state {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    fn report(&self, started_at: DateTime<Utc>, clock: Instant) -> RunReport {
        let report = RunReport {
            run_id: self.run_id,
            started_at,
            final_state: self.state,
            outcomes: self.executor.outcomes().to_vec(),
            duration_ms: clock.elapsed().as_millis() as u64,
        };

        tracing::info!(
            run_id = %report.run_id,
            statements = report.outcomes.len(),
            rows = report.total_rows(),
            duration_ms = report.duration_ms,
            "Pipeline finished"
        );

        report
    }
}
