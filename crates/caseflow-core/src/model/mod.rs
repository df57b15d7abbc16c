//! Data model: declarative metadata and the run/case/step/action records.

mod failure;
mod metadata;
mod record;

pub use failure::{CaseFailure, FailureDetail, FailureKind};
pub use metadata::{CaseId, CaseMetadata, KnownProblem, RunMetadata, TestType};
pub use record::{
    ActionRecord, CaseRecord, CaseStatus, Environment, RunRecord, RunSummary, StepRecord,
};
