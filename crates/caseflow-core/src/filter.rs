use serde::{Deserialize, Serialize};

use crate::config::{FilterConfig, KnownProblemPolicy};
use crate::ignored::IgnoreReason;
use crate::model::CaseMetadata;

/// Outcome of the filter check run before a case executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterDecision {
    Proceed,
    Skip(IgnoreReason),
}

impl FilterDecision {
    pub fn is_proceed(&self) -> bool {
        matches!(self, FilterDecision::Proceed)
    }

    pub fn skip_reason(&self) -> Option<IgnoreReason> {
        match self {
            FilterDecision::Proceed => None,
            FilterDecision::Skip(reason) => Some(*reason),
        }
    }
}

/// Decides whether a case may run. The first matching rule wins:
///
/// 1. allow-lists configured and the case is not a member → metadata filter
/// 2. known problem required but absent → known-problem filter
/// 3. known problem excluded but present → known-problem filter
/// 4. otherwise proceed
pub fn decide(metadata: &CaseMetadata, config: &FilterConfig) -> FilterDecision {
    if !allow_listed(metadata, config) {
        return FilterDecision::Skip(IgnoreReason::MetadataFilter);
    }

    match (config.known_problem, metadata.has_known_problem()) {
        (KnownProblemPolicy::Require, false) | (KnownProblemPolicy::Exclude, true) => {
            FilterDecision::Skip(IgnoreReason::KnownProblemFilter)
        }
        _ => FilterDecision::Proceed,
    }
}

fn allow_listed(metadata: &CaseMetadata, config: &FilterConfig) -> bool {
    let class_ok = config.only_classes.as_ref().map_or(true, |classes| {
        let simple = metadata.simple_class_name();
        classes
            .iter()
            .any(|c| c == simple || c == &metadata.class_name)
    });
    let case_ok = config
        .only_cases
        .as_ref()
        .map_or(true, |cases| cases.iter().any(|c| c == &metadata.method_name));
    class_ok && case_ok
}
