use thiserror::Error;

/// Errors raised by reporters.
///
/// The engine never retries or swallows these; they reach the host as-is.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Reporter '{reporter}' failed: {message}")]
    Failed { reporter: String, message: String },
}

impl ReportError {
    pub fn failed(reporter: impl Into<String>, message: impl Into<String>) -> Self {
        ReportError::Failed {
            reporter: reporter.into(),
            message: message.into(),
        }
    }
}
