use serde::{Deserialize, Serialize};

/// Run-level phase of an execution context.
///
/// A run progresses linearly and only once:
/// NotStarted → Active → Stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    /// No run record exists for the context
    #[default]
    NotStarted,
    /// A run record is open and accepting cases
    Active,
    /// The run record is closed; terminal until the context is reset
    Stopped,
}

impl RunPhase {
    /// Returns true if cases may be started in this phase.
    pub fn accepts_cases(&self) -> bool {
        matches!(self, RunPhase::NotStarted | RunPhase::Active)
    }
}

/// Case-level phase inside an active run.
///
/// FilterCheck → (Skipped | Setup → Body → Teardown → Resolved)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CasePhase {
    /// Metadata is being checked against the filter policy
    #[default]
    FilterCheck,
    /// The filter rejected the case; terminal
    Skipped,
    /// User initialization is running
    Setup,
    /// The test body is running
    Body,
    /// User cleanup is running
    Teardown,
    /// Final status decided; terminal
    Resolved,
}

impl CasePhase {
    /// Returns the phase that follows a successful completion of this one.
    ///
    /// `Skipped` is reached from `FilterCheck` only through a skip decision,
    /// never as the natural successor.
    pub fn next(&self) -> Option<CasePhase> {
        match self {
            CasePhase::FilterCheck => Some(CasePhase::Setup),
            CasePhase::Setup => Some(CasePhase::Body),
            CasePhase::Body => Some(CasePhase::Teardown),
            CasePhase::Teardown => Some(CasePhase::Resolved),
            CasePhase::Skipped | CasePhase::Resolved => None,
        }
    }

    /// Returns true if reaching this phase obliges teardown to run.
    pub fn requires_teardown(&self) -> bool {
        matches!(self, CasePhase::Body | CasePhase::Teardown)
    }

    /// Returns a human-readable name for the phase.
    pub fn display_name(&self) -> &'static str {
        match self {
            CasePhase::FilterCheck => "FilterCheck",
            CasePhase::Skipped => "Skipped",
            CasePhase::Setup => "Setup",
            CasePhase::Body => "Body",
            CasePhase::Teardown => "Teardown",
            CasePhase::Resolved => "Resolved",
        }
    }
}
