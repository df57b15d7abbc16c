use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use caseflow_core::{
    ActionRecord, CaseCompletion, CaseMetadata, CaseOutcome, CasePhase, CaseRecord,
    CollectingReporter, ContextId, EngineError, FailureDetail, FailureKind, IgnoreReason,
    InvariantViolation, LifecycleEngine, LifecycleHook, ReportError, Reporter, RunMetadata,
    RunPhase, RunRecord, TestType,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn passing_case(engine: &LifecycleEngine, ctx: &ContextId, method: &str) -> Option<CaseOutcome> {
    engine
        .notify_case_starting(ctx, &CaseMetadata::new("CartTests", method))
        .unwrap();
    engine.record_action(ctx, ActionRecord::pass("checked"));
    engine
        .notify_case_finished(ctx, CaseCompletion::Completed)
        .unwrap()
}

#[test]
fn test_full_lifecycle_emits_run() {
    init_tracing();
    let reporter = CollectingReporter::new();
    let engine = LifecycleEngine::default().with_reporter(reporter.clone());
    let ctx = ContextId::new();

    engine
        .notify_run_starting(&ctx, RunMetadata::new("CartTests").with_tag("smoke"))
        .unwrap();
    assert_eq!(passing_case(&engine, &ctx, "adds_item"), Some(CaseOutcome::Passed));
    assert_eq!(passing_case(&engine, &ctx, "removes_item"), Some(CaseOutcome::Passed));

    let run = engine.notify_run_finished(&ctx).unwrap();
    assert!(run.is_closed());
    assert_eq!(run.cases.len(), 2);
    assert_eq!(run.summary.passed, 2);
    assert!(run.summary.is_passing());
    assert!(run.cases.iter().all(CaseRecord::is_closed));

    assert_eq!(reporter.len(), 1);
    assert_eq!(reporter.last().unwrap().id, run.id);
    assert_eq!(engine.run_phase(&ctx), RunPhase::NotStarted);
}

#[test]
fn test_steps_closed_in_order() {
    let engine = LifecycleEngine::default();
    let ctx = ContextId::new();
    engine
        .notify_case_starting(&ctx, &CaseMetadata::new("CartTests", "checkout"))
        .unwrap();

    engine.start_step(&ctx, "open cart", None).unwrap();
    engine.record_action(&ctx, ActionRecord::pass("cart visible"));
    engine.start_step(&ctx, "pay", Some("card payment")).unwrap();
    engine.record_action(&ctx, ActionRecord::pass("paid"));
    engine
        .notify_case_finished(&ctx, CaseCompletion::Completed)
        .unwrap();

    let run = engine.notify_run_finished(&ctx).unwrap();
    let steps = &run.cases[0].steps;
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].name, "open cart");
    assert_eq!(steps[1].description.as_deref(), Some("card payment"));
    assert!(steps.iter().all(|s| s.stopped_at.is_some()));
}

#[test]
fn test_case_inherits_run_test_type() {
    let engine = LifecycleEngine::default();
    let ctx = ContextId::new();
    let mut run_meta = RunMetadata::new("CartTests");
    run_meta.test_type = TestType::Manual;
    engine.notify_run_starting(&ctx, run_meta).unwrap();
    engine
        .notify_case_starting(&ctx, &CaseMetadata::new("CartTests", "adds_item"))
        .unwrap();
    assert_eq!(
        engine.current_case(&ctx).unwrap().metadata.test_type,
        TestType::Manual
    );
}

#[test]
fn test_second_case_while_active_is_rejected() {
    init_tracing();
    let engine = LifecycleEngine::default();
    let ctx = ContextId::new();
    engine
        .notify_case_starting(&ctx, &CaseMetadata::new("CartTests", "first"))
        .unwrap();
    engine.record_action(&ctx, ActionRecord::pass("one"));

    let err = engine
        .notify_case_starting(&ctx, &CaseMetadata::new("CartTests", "second"))
        .unwrap_err();
    assert!(err.is_internal());
    assert!(matches!(
        err,
        EngineError::Invariant(InvariantViolation::CaseAlreadyActive { .. })
    ));

    let case = engine.current_case(&ctx).unwrap();
    assert_eq!(case.metadata.method_name, "first");
    assert_eq!(case.action_count(), 1);
}

#[test]
fn test_stop_without_start_is_rejected() {
    let engine = LifecycleEngine::default();
    let ctx = ContextId::new();
    assert!(matches!(
        engine.notify_run_finished(&ctx),
        Err(EngineError::Invariant(InvariantViolation::RunNotStarted(_)))
    ));
}

#[test]
fn test_stop_with_active_case_is_rejected() {
    let engine = LifecycleEngine::default();
    let ctx = ContextId::new();
    engine
        .notify_case_starting(&ctx, &CaseMetadata::new("CartTests", "adds_item"))
        .unwrap();
    assert!(matches!(
        engine.notify_run_finished(&ctx),
        Err(EngineError::Invariant(InvariantViolation::CaseStillActive { .. }))
    ));
    assert_eq!(engine.run_phase(&ctx), RunPhase::Active);
}

#[test]
fn test_close_twice_is_noop() {
    let engine = LifecycleEngine::default();
    let ctx = ContextId::new();
    assert!(passing_case(&engine, &ctx, "adds_item").is_some());
    assert_eq!(
        engine
            .notify_case_finished(&ctx, CaseCompletion::Completed)
            .unwrap(),
        None
    );
    assert_eq!(engine.current_run(&ctx).unwrap().cases.len(), 1);
}

#[test]
fn test_state_override_keeps_stopped_run() {
    let engine = LifecycleEngine::default();
    engine.set_state_override(true);
    let ctx = ContextId::new();
    passing_case(&engine, &ctx, "adds_item");

    let run = engine.notify_run_finished(&ctx).unwrap();
    assert_eq!(engine.run_phase(&ctx), RunPhase::Stopped);
    assert_eq!(engine.current_run(&ctx).unwrap().id, run.id);

    let err = engine
        .notify_case_starting(&ctx, &CaseMetadata::new("CartTests", "late"))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Invariant(InvariantViolation::RunAlreadyStopped(_))
    ));

    engine.reset_context(&ctx);
    assert_eq!(engine.run_phase(&ctx), RunPhase::NotStarted);
    assert!(engine.ignored_entries(&ctx).is_empty());
}

fn empty_case(engine: &LifecycleEngine, ctx: &ContextId) {
    engine
        .notify_case_starting(ctx, &CaseMetadata::new("CartTests", "empty"))
        .unwrap();
    engine
        .notify_case_finished(ctx, CaseCompletion::Completed)
        .unwrap();
}

#[test]
fn test_registry_cleared_on_run_stop() {
    let engine = LifecycleEngine::default();
    let ctx = ContextId::new();
    empty_case(&engine, &ctx);
    assert_eq!(engine.ignored_entries(&ctx).len(), 1);

    let run = engine.notify_run_finished(&ctx).unwrap();
    assert_eq!(run.ignored.len(), 1);
    assert!(engine.ignored_entries(&ctx).is_empty());
}

#[test]
fn test_registry_kept_until_reset_with_override() {
    let engine = LifecycleEngine::default();
    engine.set_state_override(true);
    let ctx = ContextId::new();
    empty_case(&engine, &ctx);
    engine.notify_run_finished(&ctx).unwrap();
    assert_eq!(engine.ignored_entries(&ctx).len(), 1);

    engine.reset_context(&ctx);
    engine
        .notify_run_starting(&ctx, RunMetadata::new("CartTests"))
        .unwrap();
    assert!(engine.ignored_entries(&ctx).is_empty());
}

#[test]
fn test_finished_runs_leave_no_state_behind() {
    let engine = LifecycleEngine::default();
    let mut contexts = Vec::new();
    for _ in 0..100 {
        let ctx = ContextId::new();
        empty_case(&engine, &ctx);
        let run = engine.notify_run_finished(&ctx).unwrap();
        assert_eq!(run.ignored.len(), 1);
        contexts.push(ctx);
    }

    assert_eq!(engine.tracked_contexts(), 0);
    assert!(contexts
        .iter()
        .all(|ctx| engine.ignored_entries(ctx).is_empty()));
}

#[test]
fn test_queries_do_not_track_unknown_context() {
    let engine = LifecycleEngine::default();
    let ctx = ContextId::new();
    assert_eq!(engine.run_phase(&ctx), RunPhase::NotStarted);
    assert!(engine.current_run(&ctx).is_none());
    assert!(engine.current_step(&ctx, None, None).is_none());
    assert!(!engine.record_action(&ctx, ActionRecord::pass("stray")));
    assert!(engine.stop_step(&ctx).is_none());
    assert!(engine.notify_run_finished(&ctx).is_err());
    assert_eq!(engine.tracked_contexts(), 0);
}

#[test]
fn test_errored_completion_fails_case() {
    let engine = LifecycleEngine::default();
    let ctx = ContextId::new();
    engine
        .notify_case_starting(&ctx, &CaseMetadata::new("CartTests", "adds_item"))
        .unwrap();
    engine.record_action(&ctx, ActionRecord::pass("before the crash"));

    let failure = FailureDetail::new(FailureKind::Uncaught, "connection reset");
    let outcome = engine
        .notify_case_finished(&ctx, CaseCompletion::Errored(failure.clone()))
        .unwrap()
        .unwrap();
    assert_eq!(outcome, CaseOutcome::Failed(failure));

    let run = engine.notify_run_finished(&ctx).unwrap();
    let actions: Vec<_> = run.cases[0].actions().collect();
    assert_eq!(actions.len(), 2);
    assert!(!actions[1].passed);
    assert_eq!(run.summary.failed, 1);
}

struct Broken;

impl Reporter for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn emit(&self, _run: &RunRecord) -> Result<(), ReportError> {
        Err(ReportError::failed("broken", "upload rejected"))
    }
}

#[test]
fn test_reporter_failure_carries_run_and_tears_down() {
    init_tracing();
    let torn_down = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&torn_down);
    let after = CollectingReporter::new();
    let engine = LifecycleEngine::default()
        .with_reporter(Broken)
        .with_reporter(after.clone())
        .with_teardown("browser", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    let ctx = ContextId::new();
    passing_case(&engine, &ctx, "adds_item");

    let err = engine.notify_run_finished(&ctx).unwrap_err();
    assert!(matches!(err, EngineError::Report { .. }));
    assert!(after.is_empty());
    assert_eq!(torn_down.load(Ordering::SeqCst), 1);

    let run = err.into_run().unwrap();
    assert_eq!(run.summary.passed, 1);
    assert!(engine.emit(&run).is_err());
    assert_eq!(torn_down.load(Ordering::SeqCst), 2);
}

#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
}

impl LifecycleHook for EventLog {
    fn before_run(&self, _context: &ContextId, run: &RunRecord) {
        self.events
            .lock()
            .push(format!("run:{}", run.metadata.class_name));
    }

    fn before_case(&self, _context: &ContextId, case: &CaseMetadata) {
        self.events.lock().push(format!("case:{}", case.method_name));
    }

    fn on_skip(&self, _context: &ContextId, case: &CaseMetadata, reason: IgnoreReason) {
        self.events
            .lock()
            .push(format!("skip:{}:{}", case.method_name, reason));
    }

    fn after_case(&self, _context: &ContextId, case: &CaseRecord) {
        self.events
            .lock()
            .push(format!("done:{}", case.metadata.method_name));
    }

    fn after_run(&self, _context: &ContextId, run: &RunRecord) {
        self.events.lock().push(format!("closed:{}", run.cases.len()));
    }
}

#[test]
fn test_hooks_fire_in_lifecycle_order() {
    let log = Arc::new(EventLog::default());
    let mut config = caseflow_core::Config::default();
    config.filter.only_cases = Some(vec!["adds_item".to_string()]);
    let engine = LifecycleEngine::new(config).with_hook(Arc::clone(&log));
    let ctx = ContextId::new();

    engine
        .notify_case_starting(&ctx, &CaseMetadata::new("CartTests", "skipped"))
        .unwrap();
    passing_case(&engine, &ctx, "adds_item");
    engine.notify_run_finished(&ctx).unwrap();

    assert_eq!(
        *log.events.lock(),
        vec![
            "run:CartTests",
            "skip:skipped:metadata-filter",
            "case:adds_item",
            "done:adds_item",
            "closed:1",
        ]
    );
}

#[test]
fn test_case_phase_tracking() {
    let engine = LifecycleEngine::default();
    let ctx = ContextId::new();
    assert_eq!(engine.case_phase(&ctx), None);
    passing_case(&engine, &ctx, "adds_item");
    assert_eq!(engine.case_phase(&ctx), Some(CasePhase::Resolved));
}
