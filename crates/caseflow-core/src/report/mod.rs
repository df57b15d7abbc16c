//! Report emission: handing closed run records to external reporters.

mod error;
mod memory;

pub use error::ReportError;
pub use memory::CollectingReporter;

use std::sync::Arc;

use tracing::{debug, error};

use crate::model::RunRecord;

/// Trait for report sinks.
///
/// Implementations may write files, push to a service, or anything else;
/// the engine only hands them the closed run record.
pub trait Reporter: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str {
        "reporter"
    }

    /// Delivers a closed run record.
    fn emit(&self, run: &RunRecord) -> Result<(), ReportError>;
}

impl<R: Reporter + ?Sized> Reporter for Arc<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn emit(&self, run: &RunRecord) -> Result<(), ReportError> {
        (**self).emit(run)
    }
}

type Teardown = Box<dyn Fn() + Send + Sync>;

/// Hands closed runs to the registered reporters, then tears down shared
/// resources.
#[derive(Default)]
pub struct ReportEmitter {
    reporters: Vec<Box<dyn Reporter>>,
    teardowns: Vec<(String, Teardown)>,
}

impl ReportEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reporter. Reporters are called in registration order.
    pub fn add_reporter(&mut self, reporter: impl Reporter + 'static) {
        self.reporters.push(Box::new(reporter));
    }

    /// Registers a shared-resource teardown run after every emission.
    pub fn add_teardown(&mut self, name: impl Into<String>, teardown: impl Fn() + Send + Sync + 'static) {
        self.teardowns.push((name.into(), Box::new(teardown)));
    }

    pub fn reporter_count(&self) -> usize {
        self.reporters.len()
    }

    /// Emits a run to every reporter, stopping at the first error.
    ///
    /// Teardowns run whether or not emission succeeded; the reporter error,
    /// if any, is returned afterwards untouched.
    pub fn emit(&self, run: &RunRecord) -> Result<(), ReportError> {
        let result = self.emit_all(run);
        for (name, teardown) in &self.teardowns {
            debug!(resource = %name, "Tearing down shared resource");
            teardown();
        }
        result
    }

    fn emit_all(&self, run: &RunRecord) -> Result<(), ReportError> {
        for reporter in &self.reporters {
            debug!(reporter = reporter.name(), run = %run.id, "Emitting run");
            if let Err(e) = reporter.emit(run) {
                error!(reporter = reporter.name(), run = %run.id, error = %e, "Reporter failed");
                return Err(e);
            }
        }
        Ok(())
    }
}
