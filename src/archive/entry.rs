/// Entry type decoded from the one-byte type flag of a header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    RegularFile,
    Directory,
    Unsupported(u8),
}

impl EntryKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            b'0' => EntryKind::RegularFile,
            b'5' => EntryKind::Directory,
            other => EntryKind::Unsupported(other),
        }
    }
}

/// Header fields that are decoded but never acted on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMetadata {
    pub mode: u64,
    pub owner_id: u64,
    pub group_id: u64,
    pub mtime: u64,
    pub checksum: u64,
    pub link_name: String,
    pub owner_name: String,
    pub group_name: String,
    pub dev_major: u64,
    pub dev_minor: u64,
    pub filename_prefix: String,
}

/// One file or directory record, borrowing its payload from the archive buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry<'a> {
    /// Name field exactly as stored (up to 100 bytes)
    pub filename: String,
    pub kind: EntryKind,
    /// Declared payload length
    pub size: u64,
    /// Zero-copy view of the payload; empty for directories
    pub contents: &'a [u8],
    pub metadata: HeaderMetadata,
}

impl ArchiveEntry<'_> {
    /// Full path, joining the ustar prefix field when the producer split a long name
    pub fn path(&self) -> String {
        if self.metadata.filename_prefix.is_empty() {
            self.filename.clone()
        } else {
            format!("{}/{}", self.metadata.filename_prefix, self.filename)
        }
    }
}
