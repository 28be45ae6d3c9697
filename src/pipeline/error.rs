//! Pipeline error types

use thiserror::Error;

use super::state::PipelineState;
use crate::database::{StatementKind, WarehouseError};
use crate::models::Relation;

/// Errors that terminate a pipeline run
///
/// Nothing is retried: the first error ends the run and every statement
/// committed before it stays in place.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid or unreadable configuration, detected before connecting
    #[error("Configuration error: {0}")]
    Config(String),

    /// The warehouse session could not be opened or was lost
    #[error("Cannot reach warehouse: {0}")]
    Connectivity(#[source] WarehouseError),

    /// A drop or create statement failed
    #[error("Schema statement on {relation} failed: {source}")]
    Schema {
        relation: Relation,
        #[source]
        source: WarehouseError,
    },

    /// A bulk load into a staging relation failed
    #[error("Bulk load into {relation} failed: {source}")]
    BulkLoad {
        relation: Relation,
        #[source]
        source: WarehouseError,
    },

    /// An insert-select into the star schema failed
    #[error("Transform into {relation} failed: {source}")]
    Transform {
        relation: Relation,
        #[source]
        source: WarehouseError,
    },

    /// A warehouse query outside the statement plan failed
    #[error("Warehouse query failed: {0}")]
    Query(#[source] WarehouseError),

    /// The orchestrator was asked to move between states it cannot connect
    #[error("Invalid pipeline transition from {from} to {to}")]
    InvalidTransition {
        from: PipelineState,
        to: PipelineState,
    },

    /// The orchestrator already ran; build a new one for another pass
    #[error("Pipeline already finished in state {0}")]
    AlreadyRun(PipelineState),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Classify a failed statement by what it was doing
    ///
    /// A lost session is reported as connectivity whatever the statement was.
    pub fn from_statement(relation: Relation, kind: StatementKind, source: WarehouseError) -> Self {
        if matches!(source, WarehouseError::ConnectionFailed(_)) {
            return PipelineError::Connectivity(source);
        }

        match kind {
            StatementKind::Drop | StatementKind::Create => {
                PipelineError::Schema { relation, source }
            }
            StatementKind::Copy => PipelineError::BulkLoad { relation, source },
            StatementKind::Insert => PipelineError::Transform { relation, source },
        }
    }

    /// Relation the failing statement targeted, if any
    pub fn relation(&self) -> Option<Relation> {
        match self {
            PipelineError::Schema { relation, .. }
            | PipelineError::BulkLoad { relation, .. }
            | PipelineError::Transform { relation, .. } => Some(*relation),
            _ => None,
        }
    }
}

impl From<WarehouseError> for PipelineError {
    fn from(err: WarehouseError) -> Self {
        match err {
            e @ WarehouseError::ConnectionFailed(_) => PipelineError::Connectivity(e),
            e @ WarehouseError::QueryFailed(_) => PipelineError::Query(e),
            WarehouseError::ConfigError(msg)
            | WarehouseError::InvalidInput(msg)
            | WarehouseError::IoError(msg) => PipelineError::Config(msg),
        }
    }
}
