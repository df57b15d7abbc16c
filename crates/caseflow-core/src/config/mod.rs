//! Configuration management for caseflow.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `caseflow.toml` file
//! 3. User config `~/.config/caseflow/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Case filtering policy.
    pub filter: FilterConfig,

    /// Status resolution policy.
    pub status: StatusConfig,

    /// Run record configuration.
    pub run: RunConfig,

    /// Ignored-ledger persistence.
    pub ledger: LedgerConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./caseflow.toml` (project local)
    /// 2. `~/.config/caseflow/config.toml` (user config)
    /// 3. Falls back to defaults
    ///
    /// Environment overrides apply in every case.
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_file(DEFAULT_CONFIG_FILE);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join(USER_CONFIG_DIR).join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Filter overrides
        if let Some(classes) = lookup(ENV_ONLY_CLASSES) {
            self.filter.only_classes = Some(split_list(&classes));
        }
        if let Some(cases) = lookup(ENV_ONLY_CASES) {
            self.filter.only_cases = Some(split_list(&cases));
        }
        if let Some(flag) = lookup(ENV_KNOWN_PROBLEM) {
            self.filter.known_problem = flag.parse()?;
        }

        // Status overrides
        if let Some(flag) = lookup(ENV_NO_ASSERTIONS_PASS) {
            self.status.no_assertions_pass = parse_bool(ENV_NO_ASSERTIONS_PASS, &flag)?;
        }

        // Ledger overrides
        if let Some(dir) = lookup(ENV_LEDGER_DIR) {
            self.ledger.data_dir = dir;
            self.ledger.enabled = true;
        }

        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::Invalid(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}

/// How the filter treats the known-problem marker.
///
/// Configured as a tri-state flag: `true` requires the marker, `false`
/// excludes marked cases, and an absent flag (or `any`) disables the check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnownProblemPolicy {
    /// No known-problem filtering
    #[default]
    Any,
    /// Only cases marked with a known problem run
    Require,
    /// Cases marked with a known problem are skipped
    Exclude,
}

impl FromStr for KnownProblemPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" => Ok(KnownProblemPolicy::Any),
            "true" | "require" => Ok(KnownProblemPolicy::Require),
            "false" | "exclude" => Ok(KnownProblemPolicy::Exclude),
            other => Err(ConfigError::Invalid(format!(
                "{} must be true, false or any, got '{}'",
                ENV_KNOWN_PROBLEM, other
            ))),
        }
    }
}

/// Case filtering configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Simple class names allowed to run. `None` allows every class.
    pub only_classes: Option<Vec<String>>,

    /// Method names allowed to run. `None` allows every method.
    pub only_cases: Option<Vec<String>>,

    /// Known-problem inclusion policy.
    pub known_problem: KnownProblemPolicy,
}

/// Status resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Treat a case with no recorded actions as passed instead of ignored.
    pub no_assertions_pass: bool,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            no_assertions_pass: DEFAULT_NO_ASSERTIONS_PASS,
        }
    }
}

/// Run record configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Environment variables captured into the environment snapshot.
    pub environment_keys: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            environment_keys: DEFAULT_ENVIRONMENT_KEYS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Ignored-ledger persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Persist the ignored ledger when a run stops.
    pub enabled: bool,

    /// Base directory for caseflow data (default: ".caseflow").
    pub data_dir: String,

    /// Ledger subdirectory name.
    pub ledger_dir: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            data_dir: DEFAULT_DATA_DIR.to_string(),
            ledger_dir: DEFAULT_LEDGER_DIR.to_string(),
        }
    }
}

impl LedgerConfig {
    /// Get the full path to the ledger directory.
    pub fn ledger_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.ledger_dir)
    }

    /// Get the full path to one run's ledger file.
    pub fn ledger_file(&self, run_id: &str) -> PathBuf {
        self.ledger_path()
            .join(format!("{}.{}", run_id, LEDGER_FILE_EXTENSION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.filter.known_problem, KnownProblemPolicy::Any);
        assert!(config.filter.only_classes.is_none());
        assert_eq!(config.status.no_assertions_pass, DEFAULT_NO_ASSERTIONS_PASS);
        assert_eq!(config.ledger.data_dir, DEFAULT_DATA_DIR);
    }

    #[test]
    fn test_known_problem_tri_state() {
        assert_eq!("true".parse::<KnownProblemPolicy>().unwrap(), KnownProblemPolicy::Require);
        assert_eq!("FALSE".parse::<KnownProblemPolicy>().unwrap(), KnownProblemPolicy::Exclude);
        assert_eq!("".parse::<KnownProblemPolicy>().unwrap(), KnownProblemPolicy::Any);
        assert!("maybe".parse::<KnownProblemPolicy>().is_err());
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_ONLY_CLASSES, "LoginTests, CartTests,"),
            (ENV_KNOWN_PROBLEM, "false"),
            (ENV_NO_ASSERTIONS_PASS, "yes"),
            (ENV_LEDGER_DIR, "/tmp/ledgers"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides_from(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(
            config.filter.only_classes,
            Some(vec!["LoginTests".to_string(), "CartTests".to_string()])
        );
        assert!(config.filter.only_cases.is_none());
        assert_eq!(config.filter.known_problem, KnownProblemPolicy::Exclude);
        assert!(config.status.no_assertions_pass);
        assert!(config.ledger.enabled);
        assert_eq!(config.ledger.data_dir, "/tmp/ledgers");
    }

    #[test]
    fn test_invalid_bool_override() {
        let mut config = Config::default();
        let result = config.apply_overrides_from(|k| {
            (k == ENV_NO_ASSERTIONS_PASS).then(|| "sometimes".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
