use std::fmt;
use uuid::Uuid;

/// Where a single `compile_and_run` call currently is.
///
/// Progress is strictly forward: `Idle → CompileInvoked → ObjectReady →
/// [SysrootFetched →] LinkInvoked → ModuleReady → Instantiated → Ran → Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PipelineState {
    Idle,
    CompileInvoked,
    ObjectReady,
    SysrootFetched,
    LinkInvoked,
    ModuleReady,
    Instantiated,
    Ran,
    Done,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::CompileInvoked => "compile-invoked",
            PipelineState::ObjectReady => "object-ready",
            PipelineState::SysrootFetched => "sysroot-fetched",
            PipelineState::LinkInvoked => "link-invoked",
            PipelineState::ModuleReady => "module-ready",
            PipelineState::Instantiated => "instantiated",
            PipelineState::Ran => "ran",
            PipelineState::Done => "done",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-invocation progress record
#[derive(Debug)]
pub(crate) struct RunTracker {
    run_id: Uuid,
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl RunTracker {
    pub(crate) fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: PipelineState::Idle,
            history: vec![PipelineState::Idle],
        }
    }

    pub(crate) fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Move to `next`, which must be later than the current state
    pub(crate) fn advance(&mut self, next: PipelineState) {
        debug_assert!(next > self.state, "{} -> {} goes backwards", self.state, next);
        tracing::debug!(from = %self.state, to = %next, "state transition");
        self.state = next;
        self.history.push(next);
    }

    pub(crate) fn state(&self) -> PipelineState {
        self.state
    }

    pub(crate) fn into_history(self) -> Vec<PipelineState> {
        self.history
    }
}
