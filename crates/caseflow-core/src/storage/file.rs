use std::fs;
use std::path::PathBuf;

use crate::config::{LedgerConfig, LEDGER_FILE_EXTENSION};

use super::error::StorageError;
use super::{IgnoredLedger, LedgerStorage, LedgerSummary};

/// File-based ledger storage.
///
/// ```text
/// .caseflow/
///   ledgers/
///     {run-id}.json        # IgnoredLedger, pretty JSON
/// ```
pub struct FileLedger {
    config: LedgerConfig,
}

impl FileLedger {
    /// Creates a new FileLedger with default config.
    pub fn new() -> Self {
        Self {
            config: LedgerConfig::default(),
        }
    }

    /// Creates a new FileLedger with custom configuration.
    pub fn with_config(config: LedgerConfig) -> Self {
        Self { config }
    }

    fn ledger_dir(&self) -> PathBuf {
        self.config.ledger_path()
    }

    fn ledger_file(&self, run_id: &str) -> PathBuf {
        self.config.ledger_file(run_id)
    }

    /// Ensures the ledger directory exists.
    fn ensure_ledger_dir(&self) -> Result<(), StorageError> {
        let dir = self.ledger_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        }
        Ok(())
    }
}

impl Default for FileLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStorage for FileLedger {
    fn save_ledger(&self, ledger: &IgnoredLedger) -> Result<(), StorageError> {
        self.ensure_ledger_dir()?;

        let path = self.ledger_file(&ledger.run_id);
        let json = serde_json::to_string_pretty(ledger)?;
        fs::write(&path, json).map_err(|e| StorageError::io(&path, e))?;

        Ok(())
    }

    fn load_ledger(&self, run_id: &str) -> Result<IgnoredLedger, StorageError> {
        let path = self.ledger_file(run_id);
        if !path.exists() {
            return Err(StorageError::LedgerNotFound(run_id.to_string()));
        }

        let json = fs::read_to_string(&path).map_err(|e| StorageError::io(&path, e))?;
        let ledger: IgnoredLedger = serde_json::from_str(&json)?;

        Ok(ledger)
    }

    fn list_ledgers(&self) -> Result<Vec<LedgerSummary>, StorageError> {
        let dir = self.ledger_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();

        let entries = fs::read_dir(&dir).map_err(|e| StorageError::io(&dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&dir, e))?;
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) != Some(LEDGER_FILE_EXTENSION) {
                continue;
            }
            if let Some(run_id) = path.file_stem().and_then(|n| n.to_str()) {
                match self.load_ledger(run_id) {
                    Ok(ledger) => summaries.push(ledger.to_summary()),
                    Err(_) => continue, // Skip unreadable ledgers
                }
            }
        }

        summaries.sort_by(|a, b| b.closed_at.cmp(&a.closed_at));

        Ok(summaries)
    }

    fn delete_ledger(&self, run_id: &str) -> Result<(), StorageError> {
        let path = self.ledger_file(run_id);
        if !path.exists() {
            return Err(StorageError::LedgerNotFound(run_id.to_string()));
        }

        fs::remove_file(&path).map_err(|e| StorageError::io(&path, e))?;

        Ok(())
    }
}
