mod error;
mod file;

pub use error::StorageError;
pub use file::FileLedger;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ignored::IgnoredEntry;
use crate::model::RunRecord;

/// The ignored-test ledger of one closed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoredLedger {
    pub run_id: String,
    pub class_name: String,
    pub closed_at: DateTime<Utc>,
    pub entries: Vec<IgnoredEntry>,
}

impl IgnoredLedger {
    /// Builds the ledger of a closed run.
    pub fn from_run(run: &RunRecord) -> Self {
        Self {
            run_id: run.id.clone(),
            class_name: run.metadata.class_name.clone(),
            closed_at: run.stopped_at.unwrap_or_else(Utc::now),
            entries: run.ignored.clone(),
        }
    }

    pub fn to_summary(&self) -> LedgerSummary {
        LedgerSummary {
            run_id: self.run_id.clone(),
            class_name: self.class_name.clone(),
            closed_at: self.closed_at,
            entry_count: self.entries.len(),
        }
    }
}

/// A lightweight summary of a ledger for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub run_id: String,
    pub class_name: String,
    pub closed_at: DateTime<Utc>,
    pub entry_count: usize,
}

/// Trait for ignored-ledger storage backends.
///
/// Implementations persist each run's ignored entries so they stay
/// readable for audit after the run completes.
pub trait LedgerStorage: Send + Sync {
    /// Saves a run's ledger, replacing any previous one for the same run.
    fn save_ledger(&self, ledger: &IgnoredLedger) -> Result<(), StorageError>;

    /// Loads a ledger by run ID.
    fn load_ledger(&self, run_id: &str) -> Result<IgnoredLedger, StorageError>;

    /// Lists all ledgers as summaries, most recent first.
    fn list_ledgers(&self) -> Result<Vec<LedgerSummary>, StorageError>;

    /// Deletes a run's ledger.
    fn delete_ledger(&self, run_id: &str) -> Result<(), StorageError>;
}
