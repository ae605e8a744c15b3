// Public API exports
pub mod archive;
pub mod bridge;
pub mod config;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod tool;
pub mod vfs;

// Re-export main types for convenience
pub use archive::{
    extract_into, ArchiveEntry, ArchiveError, ArchiveReader, EntryKind, ExtractError,
    ExtractSummary, HeaderMetadata,
};
pub use vfs::{FileEntry, FileSystem, PathSanitizer, VfsError, VirtualFs};

pub use tool::{ExitStatus, GuestInstance, GuestTool, Stage, ToolError, WasiTool};

pub use bridge::{
    BridgeError, ExecutionBridge, InstantiatedModule, PreparedModule, RunOutput, ShimConfig,
};

pub use config::{ConfigError, PipelineConfig, ToolConfig, Variant};
pub use error::{PipelineError, StageId};
pub use fetch::{fetch_bytes, FetchError, Location};
pub use pipeline::{Pipeline, PipelineState, RunReport};
