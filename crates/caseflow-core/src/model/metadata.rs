use std::fmt;

use serde::{Deserialize, Serialize};

/// Readiness classification carried by run and case metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    /// Test should be removed, no longer in use
    Retire,
    /// Test is only used manually, not for automated use
    Manual,
    /// Test is in progress, not ready to be run
    Pending,
    /// Test is ready to be run automatically
    Automated,
    /// Case-level marker meaning "take the run's test type"
    #[default]
    Default,
}

impl TestType {
    /// Sort priority; higher means further from automated use.
    pub fn priority(&self) -> i32 {
        match self {
            TestType::Retire => 10,
            TestType::Manual => 6,
            TestType::Pending => 3,
            TestType::Automated => 0,
            TestType::Default => -1,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TestType::Retire => "Test should be removed, no longer in use",
            TestType::Manual => "Test is only used manually, not for automated use",
            TestType::Pending => "Test is in progress, not ready to be run",
            TestType::Automated => "Test is ready to be run automatically",
            TestType::Default => "Used for test cases to take the run's test type",
        }
    }

    /// Resolves `Default` against the enclosing run's type.
    pub fn or_inherit(self, run_type: TestType) -> TestType {
        match self {
            TestType::Default => run_type,
            other => other,
        }
    }
}

/// Stable identifier of a case: `"{class_name}#{method_name}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(String);

impl CaseId {
    pub fn new(class_name: &str, method_name: &str) -> Self {
        Self(format!("{}#{}", class_name, method_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CaseId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Marks a case as having a known, accepted defect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownProblem {
    /// What is known to be wrong
    pub description: String,
    /// Ticket or defect identifiers tracking the problem
    #[serde(default)]
    pub linked_ids: Vec<String>,
}

impl KnownProblem {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            linked_ids: Vec::new(),
        }
    }
}

/// Declarative metadata of a run (one test class).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunMetadata {
    /// Fully qualified name of the test class
    pub class_name: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub components: Vec<String>,
    pub platforms: Vec<String>,
    pub devices: Vec<String>,
    pub related_ids: Vec<String>,
    pub related_links: Vec<String>,
    pub run_types: Vec<String>,
    pub test_type: TestType,
}

impl RunMetadata {
    /// Creates metadata for a class with nothing declared.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            test_type: TestType::Automated,
            ..Self::default()
        }
    }

    /// Returns the declared name, falling back to the class name.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.class_name)
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.components.push(component.into());
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platforms.push(platform.into());
        self
    }

    pub fn with_related_id(mut self, id: impl Into<String>) -> Self {
        self.related_ids.push(id.into());
        self
    }
}

/// Declarative metadata of a single case (one test method).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseMetadata {
    pub class_name: String,
    pub method_name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub components: Vec<String>,
    pub platforms: Vec<String>,
    pub devices: Vec<String>,
    pub related_ids: Vec<String>,
    pub related_links: Vec<String>,
    pub run_types: Vec<String>,
    /// Present when the case is marked with a known problem
    pub known_problem: Option<KnownProblem>,
    pub test_type: TestType,
}

impl CaseMetadata {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            ..Self::default()
        }
    }

    pub fn id(&self) -> CaseId {
        CaseId::new(&self.class_name, &self.method_name)
    }

    /// Class name without its module or package path.
    ///
    /// Both `a.b.Class` and `a::b::Class` yield `Class`.
    pub fn simple_class_name(&self) -> &str {
        let name = self.class_name.as_str();
        let after_path = name.rsplit("::").next().unwrap_or(name);
        after_path.rsplit('.').next().unwrap_or(after_path)
    }

    pub fn has_known_problem(&self) -> bool {
        self.known_problem.is_some()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_known_problem(mut self, problem: KnownProblem) -> Self {
        self.known_problem = Some(problem);
        self
    }

    pub fn with_test_type(mut self, test_type: TestType) -> Self {
        self.test_type = test_type;
        self
    }
}
