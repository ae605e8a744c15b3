use crate::archive::ExtractError;
use crate::vfs::VfsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to load {tool}: {reason}")]
    Load { tool: String, reason: String },

    #[error("Failed to unpack image of {tool}: {source}")]
    Image {
        tool: String,
        #[source]
        source: ExtractError,
    },

    #[error(transparent)]
    Filesystem(#[from] VfsError),

    #[error("Failed to invoke {tool}: {reason}")]
    Invoke { tool: String, reason: String },

    #[error("{tool} exited with status {status}: {diagnostics}")]
    NonZeroExit {
        tool: String,
        status: i32,
        diagnostics: String,
    },

    #[error("{tool} did not produce {path}")]
    MissingOutput { tool: String, path: String },

    #[error("{tool} trapped: {reason}")]
    Trapped { tool: String, reason: String },
}
