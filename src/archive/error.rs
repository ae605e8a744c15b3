use crate::vfs::VfsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Unsupported entry type {code:?} for {path}")]
    UnsupportedEntryType { path: String, code: char },

    #[error("Payload of {path} runs past end of archive: {size} bytes declared, {available} available")]
    TruncatedPayload {
        path: String,
        size: u64,
        available: usize,
    },
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Failed to extract {path}: {source}")]
    Filesystem {
        path: String,
        #[source]
        source: VfsError,
    },
}
