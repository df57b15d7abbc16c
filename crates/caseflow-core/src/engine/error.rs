use thiserror::Error;

use crate::model::{CaseId, RunRecord};
use crate::report::ReportError;
use crate::state::ContextId;
use crate::storage::StorageError;

/// Host-integration mistakes detected by the engine.
///
/// When one is returned the context's state has not been modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("run in context {0} is already stopped; reset the context before starting another")]
    RunAlreadyStopped(ContextId),

    #[error("no run was started in context {0}")]
    RunNotStarted(ContextId),

    #[error("case {requested} started in context {context} while case {active} is still active")]
    CaseAlreadyActive {
        context: ContextId,
        active: CaseId,
        requested: CaseId,
    },

    #[error("no case is active in context {0}")]
    NoActiveCase(ContextId),

    #[error("run in context {context} stopped while case {case} is still active")]
    CaseStillActive { context: ContextId, case: CaseId },
}

/// Errors returned by the lifecycle engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Internal error: {0}")]
    Invariant(#[from] InvariantViolation),

    /// The run was closed but a reporter rejected it. The closed record is
    /// carried so the host can re-emit it.
    #[error("Reporter failed for run {}: {source}", .run.id)]
    Report {
        run: Box<RunRecord>,
        #[source]
        source: ReportError,
    },

    /// The run was closed but its ignored ledger could not be saved; the
    /// run was not emitted.
    #[error("Ledger storage failed for run {}: {source}", .run.id)]
    Ledger {
        run: Box<RunRecord>,
        #[source]
        source: StorageError,
    },
}

impl EngineError {
    /// True for host-integration errors, as opposed to collaborator failures.
    pub fn is_internal(&self) -> bool {
        matches!(self, EngineError::Invariant(_))
    }

    /// Recovers the closed run carried by a collaborator failure.
    pub fn into_run(self) -> Option<RunRecord> {
        match self {
            EngineError::Report { run, .. } | EngineError::Ledger { run, .. } => Some(*run),
            EngineError::Invariant(_) => None,
        }
    }
}
