//! The lifecycle engine.
//!
//! A host runner drives the engine through notification hooks at run, case
//! and step boundaries. Every call names the execution context it belongs
//! to; contexts never see each other's records.
//!
//! ```text
//! notify_run_starting ─┐
//!                      ▼
//! notify_case_starting ── filter ──► Skip(reason) ─► ignored registry
//!        │ Proceed
//!        ▼
//! start_step / record_action / record_failure ...
//!        ▼
//! notify_case_finished ── resolve ──► run record
//!        ▼
//! notify_run_finished ── ledger ──► reporters
//! ```

mod case;
mod error;
mod hooks;

pub use case::{CaseScope, TestCase};
pub use error::{EngineError, InvariantViolation};
pub use hooks::LifecycleHook;

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::filter::{self, FilterDecision};
use crate::ignored::{IgnoredEntry, IgnoredRegistry};
use crate::model::{
    ActionRecord, CaseMetadata, CaseRecord, CaseStatus, Environment, FailureDetail, RunMetadata,
    RunRecord, StepRecord,
};
use crate::phase::{CasePhase, RunPhase};
use crate::report::{ReportEmitter, ReportError, Reporter};
use crate::state::{ContextId, ContextState, ScopedStateStore};
use crate::status::{self, CaseOutcome};
use crate::storage::{FileLedger, IgnoredLedger, LedgerStorage};

/// Snapshot of a context's active step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepHandle {
    pub name: String,
    pub description: Option<String>,
    pub started_at: DateTime<Utc>,
    pub action_count: usize,
}

impl StepHandle {
    fn of(step: &StepRecord) -> Self {
        Self {
            name: step.name.clone(),
            description: step.description.clone(),
            started_at: step.started_at,
            action_count: step.actions.len(),
        }
    }
}

/// How a case body ended, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseCompletion {
    /// The body returned normally
    Completed,
    /// The body (or its setup) raised a failure that nothing handled
    Errored(FailureDetail),
}

/// Orchestrates run, case and step lifecycles across execution contexts.
pub struct LifecycleEngine {
    config: Config,
    states: ScopedStateStore,
    ignored: IgnoredRegistry,
    emitter: ReportEmitter,
    hooks: Vec<Box<dyn LifecycleHook>>,
    ledger: Option<Box<dyn LedgerStorage>>,
    managed_run: AtomicBool,
    state_override: AtomicBool,
}

impl Default for LifecycleEngine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl LifecycleEngine {
    /// Creates an engine. A file ledger is attached when the configuration
    /// enables ledger persistence.
    pub fn new(config: Config) -> Self {
        let ledger: Option<Box<dyn LedgerStorage>> = if config.ledger.enabled {
            Some(Box::new(FileLedger::with_config(config.ledger.clone())))
        } else {
            None
        };
        Self {
            config,
            states: ScopedStateStore::new(),
            ignored: IgnoredRegistry::new(),
            emitter: ReportEmitter::new(),
            hooks: Vec::new(),
            ledger,
            managed_run: AtomicBool::new(true),
            state_override: AtomicBool::new(false),
        }
    }

    /// Adds a reporter; reporters receive runs in registration order.
    pub fn with_reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.emitter.add_reporter(reporter);
        self
    }

    /// Adds a shared-resource teardown run after each emission.
    pub fn with_teardown(
        mut self,
        name: impl Into<String>,
        teardown: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.emitter.add_teardown(name, teardown);
        self
    }

    /// Adds a lifecycle hook; hooks fire in registration order.
    pub fn with_hook(mut self, hook: impl LifecycleHook + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Replaces the ledger storage backend.
    pub fn with_ledger(mut self, ledger: impl LedgerStorage + 'static) -> Self {
        self.ledger = Some(Box::new(ledger));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether case starts are tracked. When off, the filter still decides
    /// but no records or ignored entries are created.
    pub fn is_managed_run(&self) -> bool {
        self.managed_run.load(Ordering::Acquire)
    }

    pub fn set_managed_run(&self, managed: bool) {
        self.managed_run.store(managed, Ordering::Release);
    }

    /// Whether the host owns context cleanup. When on, run stop leaves the
    /// context `Stopped` until [`LifecycleEngine::reset_context`].
    pub fn has_state_override(&self) -> bool {
        self.state_override.load(Ordering::Acquire)
    }

    pub fn set_state_override(&self, enabled: bool) {
        self.state_override.store(enabled, Ordering::Release);
    }

    pub fn run_phase(&self, context: &ContextId) -> RunPhase {
        self.states
            .peek(context, |state| state.run_phase)
            .unwrap_or_default()
    }

    pub fn case_phase(&self, context: &ContextId) -> Option<CasePhase> {
        self.states.peek(context, |state| state.case_phase).flatten()
    }

    /// Copy of the context's open run record.
    pub fn current_run(&self, context: &ContextId) -> Option<RunRecord> {
        self.states.peek(context, |state| state.run.clone()).flatten()
    }

    /// Copy of the context's active case record.
    pub fn current_case(&self, context: &ContextId) -> Option<CaseRecord> {
        self.states.peek(context, |state| state.case.clone()).flatten()
    }

    /// Number of contexts currently holding run or case state.
    pub fn tracked_contexts(&self) -> usize {
        self.states.len()
    }

    /// Ignored entries recorded in the context since its last run start.
    pub fn ignored_entries(&self, context: &ContextId) -> Vec<IgnoredEntry> {
        self.ignored.entries(context)
    }

    /// Returns the context to `NotStarted`, dropping its records and
    /// ignored entries.
    pub fn reset_context(&self, context: &ContextId) {
        debug!(context = %context, "Resetting context");
        self.states.clear(context);
        self.ignored.clear(context);
    }

    /// Opens the context's run record. A no-op when a run is already active.
    pub fn notify_run_starting(
        &self,
        context: &ContextId,
        metadata: RunMetadata,
    ) -> Result<(), EngineError> {
        let started = self
            .states
            .with(context, |state| self.open_run(context, state, metadata))
            .map_err(violation)?;
        if let Some(run) = started {
            self.fire(|hook| hook.before_run(context, &run));
        }
        Ok(())
    }

    fn open_run(
        &self,
        context: &ContextId,
        state: &mut ContextState,
        metadata: RunMetadata,
    ) -> Result<Option<RunRecord>, InvariantViolation> {
        if !state.run_phase.accepts_cases() {
            return Err(InvariantViolation::RunAlreadyStopped(context.clone()));
        }
        if state.run_phase == RunPhase::Active {
            return Ok(None);
        }

        self.ignored.clear(context);
        let environment = Environment::capture(&self.config.run.environment_keys);
        let run = RunRecord::new(metadata, environment);
        info!(
            context = %context,
            run = %run.id,
            class = %run.metadata.class_name,
            name = run.metadata.display_name(),
            "Starting run"
        );
        state.run = Some(run.clone());
        state.run_phase = RunPhase::Active;
        Ok(Some(run))
    }

    /// Runs the filter check for a case and, if it proceeds, opens its record.
    ///
    /// Starts the context's run first if none is active. A skipped case gets
    /// exactly one ignored entry and no record. In an unmanaged run the
    /// decision is returned without touching any record.
    pub fn notify_case_starting(
        &self,
        context: &ContextId,
        metadata: &CaseMetadata,
    ) -> Result<FilterDecision, EngineError> {
        let case_id = metadata.id();
        let decision = filter::decide(metadata, &self.config.filter);

        if !self.is_managed_run() {
            match decision {
                FilterDecision::Skip(reason) => {
                    warn!(
                        context = %context,
                        case = %case_id,
                        reason = %reason,
                        "Skipping untracked case"
                    );
                    self.fire(|hook| hook.on_skip(context, metadata, reason));
                }
                FilterDecision::Proceed => {
                    debug!(context = %context, case = %case_id, "Unmanaged run, case not tracked");
                }
            }
            return Ok(decision);
        }

        let started = self
            .states
            .with(context, |state| -> Result<_, InvariantViolation> {
                if let Some(active) = &state.case {
                    return Err(InvariantViolation::CaseAlreadyActive {
                        context: context.clone(),
                        active: active.id.clone(),
                        requested: case_id.clone(),
                    });
                }
                let started = self.open_run(
                    context,
                    state,
                    RunMetadata::new(metadata.class_name.clone()),
                )?;

                state.case_phase = Some(CasePhase::FilterCheck);
                match decision {
                    FilterDecision::Skip(reason) => {
                        self.ignored.record(context, case_id.clone(), reason);
                        state.case_phase = Some(CasePhase::Skipped);
                    }
                    FilterDecision::Proceed => {
                        let mut record = CaseRecord::new(metadata.clone());
                        if let Some(run) = &state.run {
                            record.metadata.test_type =
                                metadata.test_type.or_inherit(run.metadata.test_type);
                        }
                        state.case = Some(record);
                        state.step = None;
                        state.case_phase = Some(CasePhase::Setup);
                    }
                }
                Ok(started)
            })
            .map_err(violation)?;

        if let Some(run) = started {
            self.fire(|hook| hook.before_run(context, &run));
        }
        match decision {
            FilterDecision::Skip(reason) => {
                warn!(context = %context, case = %case_id, reason = %reason, "Skipping case");
                self.fire(|hook| hook.on_skip(context, metadata, reason));
            }
            FilterDecision::Proceed => {
                info!(
                    context = %context,
                    case = %case_id,
                    test_type = metadata.test_type.description(),
                    priority = metadata.test_type.priority(),
                    "Starting case"
                );
                self.fire(|hook| hook.before_case(context, metadata));
            }
        }
        Ok(decision)
    }

    /// Moves a case from `from` to the phase that follows it and returns
    /// that phase. The context's record is only updated while a case is
    /// active there.
    pub(crate) fn advance_case_phase(&self, context: &ContextId, from: CasePhase) -> CasePhase {
        let Some(next) = from.next() else {
            return from;
        };
        self.states.peek(context, |state| {
            if state.case.is_some() {
                debug!(context = %context, phase = next.display_name(), "Entering case phase");
                state.case_phase = Some(next);
            }
        });
        next
    }

    /// Closes the open step, if any, and starts a new one.
    pub fn start_step(
        &self,
        context: &ContextId,
        name: &str,
        description: Option<&str>,
    ) -> Result<StepHandle, EngineError> {
        self.states
            .peek(context, |state| {
                let case = state.case.as_mut()?;
                let step = StepRecord::new(name, description.map(str::to_string));
                Some(replace_step(context, case, &mut state.step, step))
            })
            .flatten()
            .ok_or_else(|| violation(InvariantViolation::NoActiveCase(context.clone())))
    }

    /// Closes the open step and appends it to its case. Closing when no
    /// step is open is a no-op.
    pub fn stop_step(&self, context: &ContextId) -> Option<StepRecord> {
        self.states
            .peek(context, |state| {
                let step = state.step.take()?.stop();
                if let Some(case) = state.case.as_mut() {
                    case.add_step(step.clone());
                }
                Some(step)
            })
            .flatten()
    }

    /// Starts or returns the active step.
    ///
    /// With a name, returns the open step if it has that name and otherwise
    /// starts a new one. Without a name, returns the open step, creating the
    /// initial step when none is open. Returns None when no case is active.
    pub fn current_step(
        &self,
        context: &ContextId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Option<StepHandle> {
        self.states
            .peek(context, |state| {
                let case = state.case.as_mut()?;
                let reuse = match (name, &state.step) {
                    (Some(name), Some(open)) => open.name == name,
                    (None, Some(_)) => true,
                    (_, None) => false,
                };
                if !reuse {
                    let step = match name {
                        Some(name) => StepRecord::new(name, description.map(str::to_string)),
                        None => StepRecord::initial(),
                    };
                    replace_step(context, case, &mut state.step, step);
                }
                state.step.as_ref().map(StepHandle::of)
            })
            .flatten()
    }

    /// Appends an action to the current step, creating the initial step
    /// when none is open.
    ///
    /// Returns false when no case is active. The first failing action
    /// becomes the case's representative failure.
    pub fn record_action(&self, context: &ContextId, action: ActionRecord) -> bool {
        self.states
            .peek(context, |state| {
                let Some(case) = state.case.as_mut() else {
                    return false;
                };
                if let Some(failure) = action.failure() {
                    debug!(context = %context, case = %case.id, action = %action.description, "Action failed");
                    case.capture_failure(failure);
                }
                if state.step.is_none() {
                    replace_step(context, case, &mut state.step, StepRecord::initial());
                }
                if let Some(step) = state.step.as_mut() {
                    step.add_action(action);
                }
                true
            })
            .unwrap_or(false)
    }

    /// Captures a failure nothing handled: forces the case status to fail,
    /// keeps the failure unless one is already held, and documents it with
    /// a synthetic failing action.
    ///
    /// Returns false when no case is active.
    pub fn record_failure(&self, context: &ContextId, failure: FailureDetail) -> bool {
        self.states
            .peek(context, |state| {
                let Some(case) = state.case.as_mut() else {
                    return false;
                };
                error!(
                    context = %context,
                    case = %case.id,
                    kind = ?failure.kind,
                    message = %failure.message,
                    "Captured unhandled failure"
                );
                case.status = CaseStatus::Fail;
                case.capture_failure(failure.clone());
                if state.step.is_none() {
                    replace_step(context, case, &mut state.step, StepRecord::initial());
                }
                if let Some(step) = state.step.as_mut() {
                    step.add_action(ActionRecord::documenting(&failure));
                }
                true
            })
            .unwrap_or(false)
    }

    /// Sets the explicit status of the active case.
    pub fn set_case_status(
        &self,
        context: &ContextId,
        status: CaseStatus,
    ) -> Result<(), EngineError> {
        self.with_case(context, |case| case.status = status)
    }

    /// Stores the active case's data value, truncated to its limit.
    pub fn set_case_data(&self, context: &ContextId, value: &str) -> Result<(), EngineError> {
        self.with_case(context, |case| case.set_data(value))
    }

    fn with_case(
        &self,
        context: &ContextId,
        f: impl FnOnce(&mut CaseRecord),
    ) -> Result<(), EngineError> {
        self.states
            .peek(context, |state| state.case.as_mut().map(f))
            .flatten()
            .ok_or_else(|| violation(InvariantViolation::NoActiveCase(context.clone())))
    }

    /// Resolves and closes the active case.
    ///
    /// Closes any open step, resolves the outcome, records an ignored entry
    /// for outcome-less cases and appends the record to the run. Returns
    /// None when no case is active, so a repeated close is harmless.
    pub fn notify_case_finished(
        &self,
        context: &ContextId,
        completion: CaseCompletion,
    ) -> Result<Option<CaseOutcome>, EngineError> {
        if let CaseCompletion::Errored(failure) = completion {
            self.record_failure(context, failure);
        }

        let closed = self.states.peek(context, |state| {
            let mut case = state.case.take()?;
            if let Some(open) = state.step.take() {
                case.add_step(open.stop());
            }
            let outcome = status::resolve(&case, &self.config.status);
            case.outcome = Some(outcome.clone());
            case.stopped_at = Some(Utc::now());
            if let CaseOutcome::Ignored(reason) = &outcome {
                self.ignored.record(context, case.id.clone(), *reason);
            }
            if let Some(run) = state.run.as_mut() {
                run.add_case(case.clone());
            }
            state.case_phase = Some(CasePhase::Resolved);
            Some((case, outcome))
        });

        let Some((case, outcome)) = closed.flatten() else {
            debug!(context = %context, "No active case to finish");
            return Ok(None);
        };

        match &outcome {
            CaseOutcome::Passed => info!(context = %context, case = %case.id, "Case passed"),
            CaseOutcome::Failed(failure) => error!(
                context = %context,
                case = %case.id,
                message = %failure.message,
                "Case failed"
            ),
            CaseOutcome::Ignored(reason) => {
                warn!(context = %context, case = %case.id, reason = %reason, "Case ignored")
            }
        }
        self.fire(|hook| hook.after_case(context, &case));
        Ok(Some(outcome))
    }

    /// Closes the context's run and hands it to the reporters.
    ///
    /// The ledger, when configured, is saved before emission. Reporter and
    /// ledger errors carry the closed run so the host can re-emit it.
    pub fn notify_run_finished(&self, context: &ContextId) -> Result<RunRecord, EngineError> {
        let keep_state = self.has_state_override();
        let run = self
            .states
            .peek(context, |state| -> Result<_, InvariantViolation> {
                match state.run_phase {
                    RunPhase::NotStarted => {
                        return Err(InvariantViolation::RunNotStarted(context.clone()))
                    }
                    RunPhase::Stopped => {
                        return Err(InvariantViolation::RunAlreadyStopped(context.clone()))
                    }
                    RunPhase::Active => {}
                }
                if let Some(case) = &state.case {
                    return Err(InvariantViolation::CaseStillActive {
                        context: context.clone(),
                        case: case.id.clone(),
                    });
                }
                let mut run = state
                    .run
                    .take()
                    .ok_or_else(|| InvariantViolation::RunNotStarted(context.clone()))?;
                run.close(self.ignored.entries(context));
                if keep_state {
                    state.run = Some(run.clone());
                    state.run_phase = RunPhase::Stopped;
                }
                Ok(run)
            })
            .unwrap_or_else(|| Err(InvariantViolation::RunNotStarted(context.clone())))
            .map_err(violation)?;

        if !keep_state {
            self.states.clear(context);
            self.ignored.clear(context);
        }

        info!(
            context = %context,
            run = %run.id,
            total = run.summary.total,
            passed = run.summary.passed,
            failed = run.summary.failed,
            ignored = run.summary.ignored,
            "Run finished"
        );
        self.fire(|hook| hook.after_run(context, &run));

        if let Some(ledger) = &self.ledger {
            if let Err(source) = ledger.save_ledger(&IgnoredLedger::from_run(&run)) {
                error!(run = %run.id, error = %source, "Failed to save ignored ledger");
                return Err(EngineError::Ledger {
                    run: Box::new(run),
                    source,
                });
            }
        }

        debug!(run = %run.id, reporters = self.emitter.reporter_count(), "Emitting run");
        if let Err(source) = self.emitter.emit(&run) {
            return Err(EngineError::Report {
                run: Box::new(run),
                source,
            });
        }
        Ok(run)
    }

    /// Hands an already-closed run to the reporters again.
    pub fn emit(&self, run: &RunRecord) -> Result<(), ReportError> {
        self.emitter.emit(run)
    }

    fn fire(&self, f: impl Fn(&dyn LifecycleHook)) {
        for hook in &self.hooks {
            f(hook.as_ref());
        }
    }
}

fn replace_step(
    context: &ContextId,
    case: &mut CaseRecord,
    slot: &mut Option<StepRecord>,
    step: StepRecord,
) -> StepHandle {
    if let Some(open) = slot.take() {
        case.add_step(open.stop());
    }
    debug!(context = %context, case = %case.id, step = %step.name, "Starting step");
    let handle = StepHandle::of(&step);
    *slot = Some(step);
    handle
}

fn violation(violation: InvariantViolation) -> EngineError {
    warn!(error = %violation, "Lifecycle invariant violated");
    EngineError::Invariant(violation)
}
