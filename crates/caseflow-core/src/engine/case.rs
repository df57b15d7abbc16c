//! Driving user test code through the engine.
//!
//! [`LifecycleEngine::run_case`] wraps a [`TestCase`] in the full case
//! lifecycle: filter check, setup, body, teardown and resolution. Panics
//! escaping user code are captured as failures instead of unwinding into
//! the host.

use std::cell::RefCell;
use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, info};

use crate::filter::FilterDecision;
use crate::model::{
    ActionRecord, CaseFailure, CaseMetadata, CaseStatus, FailureDetail, FailureKind, RunMetadata,
    RunRecord,
};
use crate::phase::CasePhase;
use crate::provider::MetadataProvider;
use crate::state::ContextId;
use crate::status::CaseOutcome;

use super::{CaseCompletion, EngineError, LifecycleEngine, StepHandle};

/// User test code executed by [`LifecycleEngine::run_case`].
///
/// Only `body` is required. Teardown runs whenever the body started, even
/// if it failed.
pub trait TestCase {
    fn setup(&mut self, _scope: &CaseScope<'_>) -> Result<(), CaseFailure> {
        Ok(())
    }

    fn body(&mut self, scope: &CaseScope<'_>) -> Result<(), CaseFailure>;

    fn teardown(&mut self, _scope: &CaseScope<'_>) -> Result<(), CaseFailure> {
        Ok(())
    }

    /// Called after the case resolved to passed.
    fn on_pass(&mut self) {}

    /// Called after the case resolved to failed.
    fn on_fail(&mut self, _failure: &FailureDetail) {}
}

/// Recording surface handed to user code while its case is active.
pub struct CaseScope<'a> {
    engine: &'a LifecycleEngine,
    context: &'a ContextId,
    first_failure: RefCell<Option<FailureDetail>>,
}

impl<'a> CaseScope<'a> {
    fn new(engine: &'a LifecycleEngine, context: &'a ContextId) -> Self {
        Self {
            engine,
            context,
            first_failure: RefCell::new(None),
        }
    }

    pub fn context(&self) -> &ContextId {
        self.context
    }

    /// Starts a new step, closing the previous one.
    pub fn step(&self, name: &str) -> Option<StepHandle> {
        self.engine.start_step(self.context, name, None).ok()
    }

    pub fn step_with_description(&self, name: &str, description: &str) -> Option<StepHandle> {
        self.engine
            .start_step(self.context, name, Some(description))
            .ok()
    }

    /// Appends an action to the current step.
    ///
    /// The first failing action is also kept on the scope, so an untracked
    /// case still fails on it.
    pub fn record(&self, action: ActionRecord) {
        if let Some(failure) = action.failure() {
            self.first_failure.borrow_mut().get_or_insert(failure);
        }
        self.engine.record_action(self.context, action);
    }

    /// Records a passing informational action.
    pub fn log(&self, message: impl Into<String>) {
        self.record(ActionRecord::pass(message));
    }

    /// Records an equality assertion. Returns whether it held.
    pub fn assert_equals<T: PartialEq + Debug>(
        &self,
        description: &str,
        expected: T,
        actual: T,
    ) -> bool {
        let passed = expected == actual;
        let action = if passed {
            ActionRecord::pass(description)
        } else {
            ActionRecord::fail(description)
        };
        self.record(
            action
                .with_expected(format!("{:?}", expected))
                .with_actual(format!("{:?}", actual)),
        );
        passed
    }

    /// Records a boolean assertion. Returns the condition.
    pub fn assert_true(&self, description: &str, condition: bool) -> bool {
        let action = if condition {
            ActionRecord::pass(description)
        } else {
            ActionRecord::fail(description)
        };
        self.record(action);
        condition
    }

    pub fn set_data(&self, value: &str) {
        self.engine.set_case_data(self.context, value).ok();
    }

    pub fn set_status(&self, status: CaseStatus) {
        self.engine.set_case_status(self.context, status).ok();
    }
}

/// Runs user code, turning an `Err` or a panic into a failure of `kind`.
fn guarded(
    kind: FailureKind,
    f: impl FnOnce() -> Result<(), CaseFailure>,
) -> Result<(), FailureDetail> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(failure)) => Err(failure.into_detail(kind)),
        Err(payload) => {
            let mut detail = FailureDetail::from_panic(payload);
            detail.kind = kind;
            Err(detail)
        }
    }
}

impl LifecycleEngine {
    /// Executes one case through its whole lifecycle.
    ///
    /// A filtered case never has its setup, body or teardown invoked. In an
    /// unmanaged run the outcome is derived from the user code's results
    /// alone.
    pub fn run_case(
        &self,
        context: &ContextId,
        metadata: &CaseMetadata,
        case: &mut dyn TestCase,
    ) -> Result<CaseOutcome, EngineError> {
        if let FilterDecision::Skip(reason) = self.notify_case_starting(context, metadata)? {
            return Ok(CaseOutcome::Ignored(reason));
        }

        let scope = CaseScope::new(self, context);
        let mut phase = CasePhase::Setup;
        let mut completion = CaseCompletion::Completed;
        let mut unhandled = None;

        match guarded(FailureKind::Setup, || case.setup(&scope)) {
            Err(failure) => {
                completion = CaseCompletion::Errored(failure.clone());
                unhandled = Some(failure);
            }
            Ok(()) => {
                phase = self.advance_case_phase(context, phase);
                if let Err(failure) = guarded(FailureKind::Uncaught, || case.body(&scope)) {
                    self.record_failure(context, failure.clone());
                    unhandled = Some(failure);
                }
            }
        }

        if phase.requires_teardown() {
            phase = self.advance_case_phase(context, phase);
            if let Err(failure) = guarded(FailureKind::Teardown, || case.teardown(&scope)) {
                self.record_failure(context, failure.clone());
                unhandled.get_or_insert(failure);
            }
        }

        let outcome = match self.notify_case_finished(context, completion)? {
            Some(outcome) => outcome,
            None => {
                debug!(
                    context = %context,
                    case = %metadata.id(),
                    phase = phase.display_name(),
                    "Deriving outcome of untracked case"
                );
                match scope.first_failure.take().or(unhandled) {
                    Some(failure) => CaseOutcome::Failed(failure),
                    None => CaseOutcome::Passed,
                }
            }
        };

        match &outcome {
            CaseOutcome::Passed => case.on_pass(),
            CaseOutcome::Failed(failure) => case.on_fail(failure),
            CaseOutcome::Ignored(_) => {}
        }
        Ok(outcome)
    }

    /// Executes every listed method of a test class as one run.
    ///
    /// Methods without metadata from the provider get bare metadata for
    /// their class and name.
    pub fn run_class(
        &self,
        context: &ContextId,
        provider: &dyn MetadataProvider,
        class_name: &str,
        cases: &mut [(String, Box<dyn TestCase>)],
    ) -> Result<RunRecord, EngineError> {
        let run_metadata = provider
            .run_metadata(class_name)
            .unwrap_or_else(|| RunMetadata::new(class_name));
        self.notify_run_starting(context, run_metadata)?;
        info!(context = %context, class = class_name, cases = cases.len(), "Running class");

        for (method, case) in cases.iter_mut() {
            let metadata = provider
                .case_metadata(class_name, method)
                .unwrap_or_else(|| CaseMetadata::new(class_name, method.as_str()));
            self.run_case(context, &metadata, case.as_mut())?;
        }

        self.notify_run_finished(context)
    }
}
