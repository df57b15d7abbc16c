//! Default values for caseflow configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Record Limits
// ============================================================================

/// Maximum number of characters kept in a case's free-text data value.
pub const DATA_VALUE_LIMIT: usize = 254;

/// Name of the step created lazily when user code records an action
/// before starting a step.
pub const INITIAL_STEP_NAME: &str = "Initial Step";

// ============================================================================
// Status Defaults
// ============================================================================

/// Whether a case that recorded no actions resolves to passed.
pub const DEFAULT_NO_ASSERTIONS_PASS: bool = false;

// ============================================================================
// Run Defaults
// ============================================================================

/// Environment variables captured into every run's environment snapshot.
pub const DEFAULT_ENVIRONMENT_KEYS: &[&str] = &["CI", "BUILD_NUMBER", "GIT_COMMIT"];

// ============================================================================
// Ledger Defaults
// ============================================================================

/// Default data directory.
pub const DEFAULT_DATA_DIR: &str = ".caseflow";

/// Default ledger subdirectory.
pub const DEFAULT_LEDGER_DIR: &str = "ledgers";

/// Extension of persisted ledger files.
pub const LEDGER_FILE_EXTENSION: &str = "json";

// ============================================================================
// Config Locations
// ============================================================================

/// Project-local config file name.
pub const DEFAULT_CONFIG_FILE: &str = "caseflow.toml";

/// Directory under the user config dir holding `config.toml`.
pub const USER_CONFIG_DIR: &str = "caseflow";

// ============================================================================
// Environment Overrides
// ============================================================================

pub const ENV_ONLY_CLASSES: &str = "CASEFLOW_ONLY_CLASSES";
pub const ENV_ONLY_CASES: &str = "CASEFLOW_ONLY_CASES";
pub const ENV_KNOWN_PROBLEM: &str = "CASEFLOW_KNOWN_PROBLEM";
pub const ENV_NO_ASSERTIONS_PASS: &str = "CASEFLOW_NO_ASSERTIONS_PASS";
pub const ENV_LEDGER_DIR: &str = "CASEFLOW_LEDGER_DIR";
