use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{CaseRecord, RunRecord, StepRecord};
use crate::phase::{CasePhase, RunPhase};

/// Identity of an execution context: the unit of strictly sequential
/// execution, typically one worker thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(String);

impl ContextId {
    /// Creates a fresh, unique context identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates a context identity from a host-chosen label.
    pub fn named(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The currently-active records of one execution context.
#[derive(Debug, Default)]
pub struct ContextState {
    pub run_phase: RunPhase,
    pub run: Option<RunRecord>,
    pub case: Option<CaseRecord>,
    pub case_phase: Option<CasePhase>,
    pub step: Option<StepRecord>,
}

impl ContextState {
    /// Resets the context to `NotStarted`, dropping all records.
    pub fn clear(&mut self) {
        *self = ContextState::default();
    }
}

/// Context-indexed store of [`ContextState`].
///
/// Each context's state sits behind its own mutex, so two contexts only
/// meet on the map lookup.
#[derive(Debug, Default)]
pub struct ScopedStateStore {
    contexts: RwLock<HashMap<ContextId, Arc<Mutex<ContextState>>>>,
}

impl ScopedStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state slot of a context, creating it on first use.
    pub fn slot(&self, context: &ContextId) -> Arc<Mutex<ContextState>> {
        if let Some(slot) = self.contexts.read().get(context) {
            return Arc::clone(slot);
        }
        let mut contexts = self.contexts.write();
        Arc::clone(contexts.entry(context.clone()).or_default())
    }

    /// Runs `f` with exclusive access to a context's state.
    pub fn with<R>(&self, context: &ContextId, f: impl FnOnce(&mut ContextState) -> R) -> R {
        let slot = self.slot(context);
        let mut state = slot.lock();
        f(&mut state)
    }

    /// Runs `f` on a context's state if the context is tracked. Never
    /// creates a slot.
    pub fn peek<R>(
        &self,
        context: &ContextId,
        f: impl FnOnce(&mut ContextState) -> R,
    ) -> Option<R> {
        let slot = self.contexts.read().get(context).map(Arc::clone)?;
        let mut state = slot.lock();
        Some(f(&mut state))
    }

    pub fn contains(&self, context: &ContextId) -> bool {
        self.contexts.read().contains_key(context)
    }

    /// Forgets a context entirely.
    pub fn clear(&self, context: &ContextId) {
        self.contexts.write().remove(context);
    }

    pub fn len(&self) -> usize {
        self.contexts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
