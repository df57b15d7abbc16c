//! Metadata lookup for test classes and methods.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::model::{CaseMetadata, RunMetadata};

/// Source of run and case metadata, keyed by class and method name.
pub trait MetadataProvider: Send + Sync {
    fn run_metadata(&self, class_name: &str) -> Option<RunMetadata>;

    fn case_metadata(&self, class_name: &str, method_name: &str) -> Option<CaseMetadata>;
}

/// In-memory metadata catalog, optionally loaded from TOML.
///
/// ```toml
/// [[runs]]
/// class_name = "CartTests"
/// tags = ["smoke"]
///
/// [[cases]]
/// class_name = "CartTests"
/// method_name = "adds_item"
/// known_problem = { description = "flaky", linked_ids = ["BUG-12"] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataCatalog {
    pub runs: Vec<RunMetadata>,
    pub cases: Vec<CaseMetadata>,
}

impl MetadataCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_run(mut self, metadata: RunMetadata) -> Self {
        self.runs.push(metadata);
        self
    }

    pub fn add_case(mut self, metadata: CaseMetadata) -> Self {
        self.cases.push(metadata);
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

impl MetadataProvider for MetadataCatalog {
    fn run_metadata(&self, class_name: &str) -> Option<RunMetadata> {
        self.runs
            .iter()
            .find(|r| r.class_name == class_name)
            .cloned()
    }

    fn case_metadata(&self, class_name: &str, method_name: &str) -> Option<CaseMetadata> {
        self.cases
            .iter()
            .find(|c| c.class_name == class_name && c.method_name == method_name)
            .cloned()
    }
}
