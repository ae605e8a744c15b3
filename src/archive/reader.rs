use super::{ArchiveEntry, ArchiveError, EntryKind, HeaderMetadata};

/// Header and payload alignment of the format
pub const BLOCK_SIZE: usize = 512;

/// Leading bytes of the magic field written by ustar/GNU encoders
const MAGIC_PREFIX: &[u8] = b"ustar";

/// Sequential reader over an in-memory ustar archive.
///
/// The cursor only moves forward. Reading stops (without error) when less
/// than one header block remains or a header lacks the `ustar` magic, which
/// also covers the zero blocks that terminate a well-formed archive.
/// Checksums are not verified.
pub struct ArchiveReader<'a> {
    buf: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> ArchiveReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            offset: 0,
            done: false,
        }
    }

    /// Current cursor position in bytes
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Read a NUL-terminated string from a fixed-width field and advance past the whole field
    pub fn read_fixed_string(&mut self, len: usize) -> String {
        let field = self.take(len);
        let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
        String::from_utf8_lossy(&field[..end]).into_owned()
    }

    /// Read an octal ASCII number from a fixed-width field.
    ///
    /// Leading spaces and NULs are skipped and digits are read up to the
    /// first non-octal byte. A field without leading digits reads as zero.
    pub fn read_octal_number(&mut self, len: usize) -> u64 {
        parse_octal(self.take(len))
    }

    /// Round the cursor up to the next block boundary
    pub fn align_to_block(&mut self) {
        self.offset = self.offset.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
    }

    /// Decode the next entry, or `None` at end of archive
    pub fn read_entry(&mut self) -> Result<Option<ArchiveEntry<'a>>, ArchiveError> {
        if self.done || self.offset + BLOCK_SIZE > self.buf.len() {
            self.done = true;
            return Ok(None);
        }

        let filename = self.read_fixed_string(100);
        let mode = self.read_octal_number(8);
        let owner_id = self.read_octal_number(8);
        let group_id = self.read_octal_number(8);
        let size = self.read_octal_number(12);
        let mtime = self.read_octal_number(12);
        let checksum = self.read_octal_number(8);
        let code = self.take(1)[0];
        let link_name = self.read_fixed_string(100);

        if !self.take(8).starts_with(MAGIC_PREFIX) {
            self.done = true;
            return Ok(None);
        }

        let metadata = HeaderMetadata {
            mode,
            owner_id,
            group_id,
            mtime,
            checksum,
            link_name,
            owner_name: self.read_fixed_string(32),
            group_name: self.read_fixed_string(32),
            dev_major: self.read_octal_number(8),
            dev_minor: self.read_octal_number(8),
            filename_prefix: self.read_fixed_string(155),
        };
        self.align_to_block();

        let mut entry = ArchiveEntry {
            filename,
            kind: EntryKind::from_code(code),
            size,
            contents: &[],
            metadata,
        };

        match entry.kind {
            EntryKind::RegularFile => {
                let available = self.buf.len() - self.offset;
                let len = match usize::try_from(size) {
                    Ok(len) if len <= available => len,
                    _ => {
                        self.done = true;
                        return Err(ArchiveError::TruncatedPayload {
                            path: entry.path(),
                            size,
                            available,
                        });
                    }
                };
                entry.contents = &self.buf[self.offset..self.offset + len];
                self.offset += len;
                self.align_to_block();
            }
            EntryKind::Directory => {}
            EntryKind::Unsupported(code) => {
                self.done = true;
                return Err(ArchiveError::UnsupportedEntryType {
                    path: entry.path(),
                    code: code as char,
                });
            }
        }

        Ok(Some(entry))
    }

    /// Slice `len` bytes at the cursor and advance. Callers stay within the
    /// header block checked by `read_entry`.
    fn take(&mut self, len: usize) -> &'a [u8] {
        let start = self.offset.min(self.buf.len());
        let end = (self.offset + len).min(self.buf.len());
        self.offset += len;
        &self.buf[start..end]
    }
}

impl<'a> Iterator for ArchiveReader<'a> {
    type Item = Result<ArchiveEntry<'a>, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_entry().transpose()
    }
}

impl std::iter::FusedIterator for ArchiveReader<'_> {}

fn parse_octal(field: &[u8]) -> u64 {
    field
        .iter()
        .skip_while(|&&b| b == b' ' || b == 0)
        .take_while(|&&b| (b'0'..=b'7').contains(&b))
        .fold(0u64, |value, &b| {
            value.saturating_mul(8).saturating_add(u64::from(b - b'0'))
        })
}
