use std::any::Any;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a captured failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// A recorded action with `passed = false`
    Assertion,
    /// An error or panic escaping the test body
    Uncaught,
    /// User initialization failed before the body ran
    Setup,
    /// User cleanup failed after the body ran
    Teardown,
    /// The case status was explicitly set to fail
    StatusOverride,
}

/// A captured failure: message plus optional structured detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub kind: FailureKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl FailureDetail {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Converts a caught panic payload into an uncaught failure.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "test body panicked with a non-string payload".to_string()
        };
        Self::new(FailureKind::Uncaught, message).with_detail("panic")
    }
}

/// Error type returned by user setup, body and teardown code.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CaseFailure {
    pub message: String,
    pub detail: Option<String>,
}

impl CaseFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn into_detail(self, kind: FailureKind) -> FailureDetail {
        FailureDetail {
            kind,
            message: self.message,
            detail: self.detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_panic_str_payload() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        let detail = FailureDetail::from_panic(payload);
        assert_eq!(detail.kind, FailureKind::Uncaught);
        assert_eq!(detail.message, "boom");
    }

    #[test]
    fn test_from_panic_string_payload() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("index out of bounds"));
        assert_eq!(FailureDetail::from_panic(payload).message, "index out of bounds");
    }

    #[test]
    fn test_case_failure_keeps_detail() {
        let detail = CaseFailure::new("db down")
            .with_detail("connection refused")
            .into_detail(FailureKind::Setup);
        assert_eq!(detail.kind, FailureKind::Setup);
        assert_eq!(detail.detail.as_deref(), Some("connection refused"));
    }
}
