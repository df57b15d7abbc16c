use serde::{Deserialize, Serialize};

use crate::config::StatusConfig;
use crate::ignored::IgnoreReason;
use crate::model::{CaseRecord, CaseStatus, FailureDetail, FailureKind, StepRecord};

/// Final status of a resolved case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "detail", rename_all = "lowercase")]
pub enum CaseOutcome {
    Passed,
    Failed(FailureDetail),
    Ignored(IgnoreReason),
}

impl CaseOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, CaseOutcome::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CaseOutcome::Failed(_))
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, CaseOutcome::Ignored(_))
    }

    pub fn failure(&self) -> Option<&FailureDetail> {
        match self {
            CaseOutcome::Failed(detail) => Some(detail),
            _ => None,
        }
    }
}

/// A step is clean when every action in it passed. Empty steps are clean.
pub fn step_is_clean(step: &StepRecord) -> bool {
    step.actions.iter().all(|a| a.passed)
}

/// The representative failure of a case: the captured one, else the first
/// failing action in step order.
pub fn representative_failure(case: &CaseRecord) -> Option<FailureDetail> {
    case.failure
        .clone()
        .or_else(|| case.actions().find_map(|a| a.failure()))
}

/// Resolves a closed case's outcome. Precedence, first match wins:
///
/// 1. a captured failure (uncaught, setup, teardown or assertion)
/// 2. explicit status `Fail`
/// 3. any unclean step
/// 4. explicit status `Pass`
/// 5. no actions at all: the no-assertion policy
/// 6. otherwise passed
pub fn resolve(case: &CaseRecord, config: &StatusConfig) -> CaseOutcome {
    if let Some(failure) = &case.failure {
        return CaseOutcome::Failed(failure.clone());
    }

    if case.status == CaseStatus::Fail {
        let failure = representative_failure(case).unwrap_or_else(|| {
            FailureDetail::new(FailureKind::StatusOverride, "case status was set to fail")
        });
        return CaseOutcome::Failed(failure);
    }

    if !case.steps.iter().all(step_is_clean) {
        if let Some(failure) = representative_failure(case) {
            return CaseOutcome::Failed(failure);
        }
    }

    if case.status == CaseStatus::Pass {
        return CaseOutcome::Passed;
    }

    if case.action_count() == 0 {
        return if config.no_assertions_pass {
            CaseOutcome::Passed
        } else {
            CaseOutcome::Ignored(IgnoreReason::NoAssertions)
        };
    }

    CaseOutcome::Passed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActionRecord, CaseMetadata};

    fn case_with(actions: Vec<ActionRecord>) -> CaseRecord {
        let mut case = CaseRecord::new(CaseMetadata::new("C", "m"));
        let mut step = StepRecord::initial();
        for action in actions {
            step.add_action(action);
        }
        case.add_step(step);
        case
    }

    #[test]
    fn test_empty_step_is_clean() {
        assert!(step_is_clean(&StepRecord::initial()));
    }

    #[test]
    fn test_all_passing_actions_pass() {
        let case = case_with(vec![ActionRecord::pass("a"), ActionRecord::pass("b")]);
        assert_eq!(resolve(&case, &StatusConfig::default()), CaseOutcome::Passed);
    }

    #[test]
    fn test_first_failing_action_is_representative() {
        let case = case_with(vec![
            ActionRecord::pass("a"),
            ActionRecord::fail("first"),
            ActionRecord::fail("second"),
        ]);
        let outcome = resolve(&case, &StatusConfig::default());
        assert_eq!(outcome.failure().unwrap().message, "first");
    }

    #[test]
    fn test_no_actions_policy() {
        let case = case_with(vec![]);
        assert_eq!(
            resolve(&case, &StatusConfig::default()),
            CaseOutcome::Ignored(IgnoreReason::NoAssertions)
        );
        let lenient = StatusConfig {
            no_assertions_pass: true,
        };
        assert_eq!(resolve(&case, &lenient), CaseOutcome::Passed);
    }

    #[test]
    fn test_explicit_status_overrides_no_actions() {
        let mut case = case_with(vec![]);
        case.status = CaseStatus::Pass;
        assert_eq!(resolve(&case, &StatusConfig::default()), CaseOutcome::Passed);

        case.status = CaseStatus::Fail;
        let outcome = resolve(&case, &StatusConfig::default());
        assert_eq!(outcome.failure().unwrap().kind, FailureKind::StatusOverride);
    }

    #[test]
    fn test_failing_action_beats_pass_override() {
        let mut case = case_with(vec![ActionRecord::fail("bad")]);
        case.status = CaseStatus::Pass;
        assert!(resolve(&case, &StatusConfig::default()).is_failed());
    }

    #[test]
    fn test_captured_failure_wins() {
        let mut case = case_with(vec![ActionRecord::pass("a")]);
        case.capture_failure(FailureDetail::new(FailureKind::Uncaught, "boom"));
        let outcome = resolve(&case, &StatusConfig::default());
        assert_eq!(outcome.failure().unwrap().kind, FailureKind::Uncaught);
    }
}
