mod entry;
mod error;
mod reader;


pub use entry::{ArchiveEntry, EntryKind, HeaderMetadata};
pub use error::{ArchiveError, ExtractError};
pub use reader::{ArchiveReader, BLOCK_SIZE};

use crate::vfs::FileSystem;

/// Counts of what an extraction wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}

/// Unpack an archive into a filesystem, in archive order.
///
/// Directories are created, regular files written at their path. An
/// unsupported entry aborts the whole extraction; entries already applied
/// stay in the target.
pub fn extract_into<F>(archive: &[u8], fs: &mut F) -> Result<ExtractSummary, ExtractError>
where
    F: FileSystem + ?Sized,
{
    let mut summary = ExtractSummary::default();

    for entry in ArchiveReader::new(archive) {
        let entry = entry?;
        let path = entry.path();

        let result = match entry.kind {
            EntryKind::Directory => {
                summary.directories += 1;
                fs.mkdir(&path)
            }
            EntryKind::RegularFile => {
                summary.files += 1;
                summary.bytes += entry.size;
                fs.write_file(&path, entry.contents)
            }
            // The reader turns these into errors before they get here
            EntryKind::Unsupported(code) => {
                return Err(ArchiveError::UnsupportedEntryType {
                    path,
                    code: code as char,
                }
                .into());
            }
        };
        result.map_err(|source| ExtractError::Filesystem {
            path: path.clone(),
            source,
        })?;

        tracing::trace!(path = %path, kind = ?entry.kind, size = entry.size, "extracted entry");
    }

    Ok(summary)
}
