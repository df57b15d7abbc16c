use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::model::CaseId;
use crate::state::ContextId;

/// Why a case ended up ignored.
///
/// The serialized codes are a compatibility contract with tooling that
/// parses reports; never change them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IgnoreReason {
    /// The case or class is not in the configured allow-list
    #[serde(rename = "metadata-filter")]
    MetadataFilter,
    /// The known-problem marker conflicts with the configured policy
    #[serde(rename = "known-problem-filter")]
    KnownProblemFilter,
    /// The case finished without recording any action
    #[serde(rename = "no-assertions")]
    NoAssertions,
}

impl IgnoreReason {
    pub fn code(&self) -> &'static str {
        match self {
            IgnoreReason::MetadataFilter => "metadata-filter",
            IgnoreReason::KnownProblemFilter => "known-problem-filter",
            IgnoreReason::NoAssertions => "no-assertions",
        }
    }
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoredEntry {
    pub case_id: CaseId,
    pub reason: IgnoreReason,
    pub recorded_at: DateTime<Utc>,
}

/// Per-context ledger of ignored cases.
///
/// Entries are write-once: the first reason recorded for a case is final.
#[derive(Debug, Default)]
pub struct IgnoredRegistry {
    entries: RwLock<HashMap<ContextId, Vec<IgnoredEntry>>>,
}

impl IgnoredRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a reason for a case.
    ///
    /// Returns false, leaving the existing entry untouched, if the case
    /// already has one in this context.
    pub fn record(&self, context: &ContextId, case_id: CaseId, reason: IgnoreReason) -> bool {
        let mut entries = self.entries.write();
        let list = entries.entry(context.clone()).or_default();
        if list.iter().any(|e| e.case_id == case_id) {
            return false;
        }
        list.push(IgnoredEntry {
            case_id,
            reason,
            recorded_at: Utc::now(),
        });
        true
    }

    pub fn reason(&self, context: &ContextId, case_id: &CaseId) -> Option<IgnoreReason> {
        self.entries
            .read()
            .get(context)
            .and_then(|list| list.iter().find(|e| &e.case_id == case_id))
            .map(|e| e.reason)
    }

    /// Entries of one context in the order they were recorded.
    pub fn entries(&self, context: &ContextId) -> Vec<IgnoredEntry> {
        self.entries
            .read()
            .get(context)
            .cloned()
            .unwrap_or_default()
    }

    pub fn clear(&self, context: &ContextId) {
        self.entries.write().remove(context);
    }
}
