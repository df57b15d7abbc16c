pub mod config;
pub mod engine;
pub mod filter;
pub mod ignored;
pub mod model;
pub mod phase;
pub mod provider;
pub mod report;
pub mod state;
pub mod status;
pub mod storage;

pub use config::{Config, ConfigError, KnownProblemPolicy};
pub use engine::{
    CaseCompletion, CaseScope, EngineError, InvariantViolation, LifecycleEngine, LifecycleHook,
    StepHandle, TestCase,
};
pub use filter::FilterDecision;
pub use ignored::{IgnoreReason, IgnoredEntry, IgnoredRegistry};
pub use model::{
    ActionRecord, CaseFailure, CaseId, CaseMetadata, CaseRecord, CaseStatus, FailureDetail,
    FailureKind, KnownProblem, RunMetadata, RunRecord, StepRecord, TestType,
};
pub use phase::{CasePhase, RunPhase};
pub use provider::{MetadataCatalog, MetadataProvider};
pub use report::{CollectingReporter, ReportEmitter, ReportError, Reporter};
pub use state::ContextId;
pub use status::CaseOutcome;
pub use storage::{FileLedger, IgnoredLedger, LedgerStorage, StorageError};
