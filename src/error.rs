use crate::archive::ArchiveError;
use crate::bridge::BridgeError;
use crate::fetch::FetchError;
use crate::tool::ToolError;
use std::fmt;
use thiserror::Error;

/// Step of the pipeline a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    FetchSource,
    FetchSysroot,
    Compile,
    ExtractSysroot,
    Link,
    Instantiate,
    Run,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::FetchSource => "fetch-source",
            StageId::FetchSysroot => "fetch-sysroot",
            StageId::Compile => "compile",
            StageId::ExtractSysroot => "extract-sysroot",
            StageId::Link => "link",
            StageId::Instantiate => "instantiate",
            StageId::Run => "run",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single failure a pipeline run can end with
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("[{stage}] archive format error: {source}")]
    Archive {
        stage: StageId,
        #[source]
        source: ArchiveError,
    },

    #[error("[{stage}] tool invocation failed: {source}")]
    ToolInvocation {
        stage: StageId,
        #[source]
        source: ToolError,
    },

    #[error("[instantiate] module format error: {0}")]
    ModuleFormat(#[source] BridgeError),

    #[error("[run] execution trapped: {0}")]
    ExecutionTrap(#[source] BridgeError),

    #[error("[{stage}] network error: {source}")]
    Network {
        stage: StageId,
        #[source]
        source: FetchError,
    },
}

impl PipelineError {
    /// The stage that failed
    pub fn stage(&self) -> StageId {
        match self {
            PipelineError::Archive { stage, .. }
            | PipelineError::ToolInvocation { stage, .. }
            | PipelineError::Network { stage, .. } => *stage,
            PipelineError::ModuleFormat(_) => StageId::Instantiate,
            PipelineError::ExecutionTrap(_) => StageId::Run,
        }
    }

    pub(crate) fn tool(stage: StageId, source: impl Into<ToolError>) -> Self {
        PipelineError::ToolInvocation {
            stage,
            source: source.into(),
        }
    }
}

impl From<BridgeError> for PipelineError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::ExecutionTrap(_) => PipelineError::ExecutionTrap(err),
            // A module that cannot be bound to the shim or has no entry
            // point is as unusable as one that fails validation.
            _ => PipelineError::ModuleFormat(err),
        }
    }
}
