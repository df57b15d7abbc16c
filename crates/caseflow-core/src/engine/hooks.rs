use crate::ignored::IgnoreReason;
use crate::model::{CaseMetadata, CaseRecord, RunRecord};
use crate::state::ContextId;

/// Observer invoked by the engine at run and case boundaries.
///
/// Hooks run in registration order, always outside the engine's locks, so
/// they may call back into the engine. Every method defaults to a no-op.
pub trait LifecycleHook: Send + Sync {
    /// A run record was opened.
    fn before_run(&self, _context: &ContextId, _run: &RunRecord) {}

    /// A case passed the filter and its record was opened.
    fn before_case(&self, _context: &ContextId, _case: &CaseMetadata) {}

    /// A case was rejected by the filter.
    fn on_skip(&self, _context: &ContextId, _case: &CaseMetadata, _reason: IgnoreReason) {}

    /// A case record was resolved and appended to its run.
    fn after_case(&self, _context: &ContextId, _case: &CaseRecord) {}

    /// A run record was closed, before it is handed to reporters.
    fn after_run(&self, _context: &ContextId, _run: &RunRecord) {}
}

impl<H: LifecycleHook + ?Sized> LifecycleHook for std::sync::Arc<H> {
    fn before_run(&self, context: &ContextId, run: &RunRecord) {
        (**self).before_run(context, run)
    }

    fn before_case(&self, context: &ContextId, case: &CaseMetadata) {
        (**self).before_case(context, case)
    }

    fn on_skip(&self, context: &ContextId, case: &CaseMetadata, reason: IgnoreReason) {
        (**self).on_skip(context, case, reason)
    }

    fn after_case(&self, context: &ContextId, case: &CaseRecord) {
        (**self).after_case(context, case)
    }

    fn after_run(&self, context: &ContextId, run: &RunRecord) {
        (**self).after_run(context, run)
    }
}
