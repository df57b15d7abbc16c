use std::thread;

use caseflow_core::{
    ActionRecord, CaseCompletion, CaseMetadata, CollectingReporter, ContextId, LifecycleEngine,
    RunMetadata, RunRecord,
};

fn run_worker(engine: &LifecycleEngine, worker: usize) -> RunRecord {
    let ctx = ContextId::named(format!("worker-{}", worker));
    let class = format!("Worker{}Tests", worker);
    engine
        .notify_run_starting(&ctx, RunMetadata::new(class.clone()))
        .unwrap();
    for case in 0..5 {
        let meta = CaseMetadata::new(class.clone(), format!("case_{}", case));
        engine.notify_case_starting(&ctx, &meta).unwrap();
        engine.start_step(&ctx, "work", None).unwrap();
        for n in 0..=worker {
            engine.record_action(&ctx, ActionRecord::pass(format!("action {}", n)));
        }
        engine
            .notify_case_finished(&ctx, CaseCompletion::Completed)
            .unwrap();
    }
    engine.notify_run_finished(&ctx).unwrap()
}

#[test]
fn test_contexts_are_isolated_across_threads() {
    let reporter = CollectingReporter::new();
    let engine = LifecycleEngine::default().with_reporter(reporter.clone());

    let runs: Vec<RunRecord> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let engine = &engine;
                s.spawn(move || run_worker(engine, worker))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (worker, run) in runs.iter().enumerate() {
        assert_eq!(run.metadata.class_name, format!("Worker{}Tests", worker));
        assert_eq!(run.cases.len(), 5);
        assert_eq!(run.summary.passed, 5);
        for case in &run.cases {
            assert_eq!(case.action_count(), worker + 1);
            assert_eq!(case.metadata.class_name, run.metadata.class_name);
        }
    }
    assert_eq!(reporter.len(), 8);
}

#[test]
fn test_interleaved_contexts_on_one_thread() {
    let engine = LifecycleEngine::default();
    let a = ContextId::named("a");
    let b = ContextId::named("b");

    engine
        .notify_case_starting(&a, &CaseMetadata::new("A", "first"))
        .unwrap();
    engine
        .notify_case_starting(&b, &CaseMetadata::new("B", "first"))
        .unwrap();
    engine.record_action(&a, ActionRecord::pass("a only"));

    assert_eq!(engine.current_case(&a).unwrap().action_count(), 1);
    assert_eq!(engine.current_case(&b).unwrap().action_count(), 0);

    engine
        .notify_case_finished(&b, CaseCompletion::Completed)
        .unwrap();
    assert_eq!(engine.ignored_entries(&b).len(), 1);
    assert!(engine.ignored_entries(&a).is_empty());
}
