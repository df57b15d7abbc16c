use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{DATA_VALUE_LIMIT, INITIAL_STEP_NAME};
use crate::ignored::IgnoredEntry;
use crate::status::CaseOutcome;

use super::failure::{FailureDetail, FailureKind};
use super::metadata::{CaseId, CaseMetadata, RunMetadata};

/// One atomic assertion or logged event inside a step.
///
/// Appended to its step and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub description: String,
    pub passed: bool,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub message: Option<String>,
    /// Captured error, for actions documenting an uncaught failure
    pub error: Option<FailureDetail>,
    pub recorded_at: DateTime<Utc>,
}

impl ActionRecord {
    fn new(description: impl Into<String>, passed: bool) -> Self {
        Self {
            description: description.into(),
            passed,
            expected: None,
            actual: None,
            message: None,
            error: None,
            recorded_at: Utc::now(),
        }
    }

    /// A passing action.
    pub fn pass(description: impl Into<String>) -> Self {
        Self::new(description, true)
    }

    /// A failing action.
    pub fn fail(description: impl Into<String>) -> Self {
        Self::new(description, false)
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_error(mut self, error: FailureDetail) -> Self {
        self.error = Some(error);
        self
    }

    /// Synthetic failing action documenting a captured failure.
    pub fn documenting(failure: &FailureDetail) -> Self {
        let description = match failure.kind {
            FailureKind::Uncaught => "Unhandled failure in test body",
            FailureKind::Setup => "Failure during case setup",
            FailureKind::Teardown => "Failure during case teardown",
            FailureKind::StatusOverride => "Case status set to fail",
            FailureKind::Assertion => "Assertion failed",
        };
        Self::fail(description)
            .with_message(failure.message.clone())
            .with_error(failure.clone())
    }

    /// The failure this action represents, if it did not pass.
    pub fn failure(&self) -> Option<FailureDetail> {
        if self.passed {
            return None;
        }
        if let Some(error) = &self.error {
            return Some(error.clone());
        }
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| self.description.clone());
        let mut detail = FailureDetail::new(FailureKind::Assertion, message);
        if self.expected.is_some() || self.actual.is_some() {
            detail = detail.with_detail(format!(
                "expected: {}, actual: {}",
                self.expected.as_deref().unwrap_or("<none>"),
                self.actual.as_deref().unwrap_or("<none>")
            ));
        }
        Some(detail)
    }
}

/// A named phase inside a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub description: Option<String>,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub actions: Vec<ActionRecord>,
}

impl StepRecord {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
            started_at: Utc::now(),
            stopped_at: None,
            actions: Vec::new(),
        }
    }

    /// The step created on first access when none was started explicitly.
    pub fn initial() -> Self {
        Self::new(INITIAL_STEP_NAME, None)
    }

    pub fn add_action(&mut self, action: ActionRecord) {
        self.actions.push(action);
    }

    pub(crate) fn stop(mut self) -> Self {
        self.stopped_at = Some(Utc::now());
        self
    }
}

/// Explicit, tri-state case status set by user code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    #[default]
    Unset,
    Pass,
    Fail,
}

/// One test-method execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: CaseId,
    pub description: Option<String>,
    pub metadata: CaseMetadata,
    pub status: CaseStatus,
    /// Free-text value, at most `DATA_VALUE_LIMIT` characters
    pub data: Option<String>,
    pub steps: Vec<StepRecord>,
    /// First captured failure; later failures never replace it
    pub failure: Option<FailureDetail>,
    pub outcome: Option<CaseOutcome>,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
}

impl CaseRecord {
    pub fn new(metadata: CaseMetadata) -> Self {
        Self {
            id: metadata.id(),
            description: metadata.description.clone(),
            metadata,
            status: CaseStatus::Unset,
            data: None,
            steps: Vec::new(),
            failure: None,
            outcome: None,
            started_at: Utc::now(),
            stopped_at: None,
        }
    }

    /// Stores the data value, truncated to `DATA_VALUE_LIMIT` characters.
    pub fn set_data(&mut self, value: &str) {
        self.data = Some(truncate_chars(value, DATA_VALUE_LIMIT));
    }

    /// Records a failure unless one is already held.
    pub fn capture_failure(&mut self, failure: FailureDetail) {
        if self.failure.is_none() {
            self.failure = Some(failure);
        }
    }

    pub fn add_step(&mut self, step: StepRecord) {
        self.steps.push(step);
    }

    pub fn action_count(&self) -> usize {
        self.steps.iter().map(|s| s.actions.len()).sum()
    }

    pub fn actions(&self) -> impl Iterator<Item = &ActionRecord> {
        self.steps.iter().flat_map(|s| s.actions.iter())
    }

    pub fn is_closed(&self) -> bool {
        self.stopped_at.is_some()
    }
}

fn truncate_chars(value: &str, limit: usize) -> String {
    match value.char_indices().nth(limit) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// Snapshot of the host environment taken at run start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub os: String,
    pub arch: String,
    pub hostname: Option<String>,
    pub user: Option<String>,
    /// Values of the configured environment keys that were set
    pub variables: BTreeMap<String, String>,
}

impl Environment {
    /// Captures the current process environment.
    pub fn capture(keys: &[String]) -> Self {
        let variables = keys
            .iter()
            .filter_map(|k| std::env::var(k).ok().map(|v| (k.clone(), v)))
            .collect();
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            hostname: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("COMPUTERNAME"))
                .ok(),
            user: std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .ok(),
            variables,
        }
    }
}

/// Aggregate counts over a closed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub ignored: usize,
}

impl RunSummary {
    /// A run passes when no case failed.
    pub fn is_passing(&self) -> bool {
        self.failed == 0
    }
}

/// One test-class execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub metadata: RunMetadata,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub cases: Vec<CaseRecord>,
    /// Ignored entries of the context, copied at close
    pub ignored: Vec<IgnoredEntry>,
    pub environment: Environment,
    pub summary: RunSummary,
}

impl RunRecord {
    pub fn new(metadata: RunMetadata, environment: Environment) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            metadata,
            started_at: Utc::now(),
            stopped_at: None,
            cases: Vec::new(),
            ignored: Vec::new(),
            environment,
            summary: RunSummary::default(),
        }
    }

    pub fn add_case(&mut self, case: CaseRecord) {
        self.cases.push(case);
    }

    pub fn is_closed(&self) -> bool {
        self.stopped_at.is_some()
    }

    /// Closes the record. Counts cases by outcome; skipped cases count as
    /// ignored alongside outcome-less ones.
    pub(crate) fn close(&mut self, ignored: Vec<IgnoredEntry>) {
        let mut summary = RunSummary::default();
        for case in &self.cases {
            match case.outcome {
                Some(CaseOutcome::Passed) => summary.passed += 1,
                Some(CaseOutcome::Failed(_)) => summary.failed += 1,
                Some(CaseOutcome::Ignored(_)) | None => {}
            }
        }
        summary.ignored = ignored.len();
        summary.total = summary.passed + summary.failed + summary.ignored;
        self.summary = summary;
        self.ignored = ignored;
        self.stopped_at = Some(Utc::now());
    }
}
