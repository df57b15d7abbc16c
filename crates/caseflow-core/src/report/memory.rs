use std::sync::Arc;

use parking_lot::Mutex;

use crate::model::RunRecord;

use super::error::ReportError;
use super::Reporter;

/// Reporter that keeps every emitted run in memory.
///
/// Clones share the same buffer, so a host can hand one clone to the
/// engine and read the runs back through another.
#[derive(Debug, Clone, Default)]
pub struct CollectingReporter {
    runs: Arc<Mutex<Vec<RunRecord>>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every run emitted so far, oldest first.
    pub fn runs(&self) -> Vec<RunRecord> {
        self.runs.lock().clone()
    }

    pub fn last(&self) -> Option<RunRecord> {
        self.runs.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.runs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Reporter for CollectingReporter {
    fn name(&self) -> &str {
        "collecting"
    }

    fn emit(&self, run: &RunRecord) -> Result<(), ReportError> {
        self.runs.lock().push(run.clone());
        Ok(())
    }
}
