//! Pipeline state machine

use serde::{Deserialize, Serialize};

/// Stage that was executing when a run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Opening or checking the warehouse session
    Connect,
    SchemaReset,
    StagingLoad,
    Transform,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Connect => write!(f, "connect"),
            PipelineStage::SchemaReset => write!(f, "schema reset"),
            PipelineStage::StagingLoad => write!(f, "staging load"),
            PipelineStage::Transform => write!(f, "transform"),
        }
    }
}

/// Where a pipeline run stands
///
/// ```text
/// Init -> SchemaReset -> StagingLoaded -> Transformed -> Done
///   \________________________/^  \_______________________/^
///    (load without reset)          (create tables only)
/// ```
///
/// Every non-terminal state can move to `Failed`. There is no way back out of
/// `Done` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    SchemaReset,
    StagingLoaded,
    Transformed,
    Done,
    Failed { stage: PipelineStage },
}

impl PipelineState {
    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed { .. })
    }

    /// Whether the machine may move from `self` to `next`
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;

        if self.is_terminal() {
            return false;
        }

        matches!(
            (self, next),
            (_, Failed { .. })
                | (Init, SchemaReset)
                | (Init, StagingLoaded)
                | (SchemaReset, StagingLoaded)
                | (SchemaReset, Done)
                | (StagingLoaded, Transformed)
                | (Transformed, Done)
        )
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Init => write!(f, "init"),
            PipelineState::SchemaReset => write!(f, "schema_reset"),
            PipelineState::StagingLoaded => write!(f, "staging_loaded"),
            PipelineState::Transformed => write!(f, "transformed"),
            PipelineState::Done => write!(f, "done"),
            PipelineState::Failed { stage } => write!(f, "failed ({})", stage),
        }
    }
}
