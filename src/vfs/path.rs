use super::VfsError;
use std::path::{Component, Path};

pub struct PathSanitizer;

impl PathSanitizer {
    /// Normalize a guest path to its key inside a sandboxed filesystem.
    ///
    /// The sandbox root is `/`, so absolute paths are accepted and re-rooted:
    /// `/lib/crt1.o`, `lib/crt1.o` and `./lib/crt1.o/` all map to `lib/crt1.o`.
    /// The root itself maps to the empty string.
    ///
    /// Parent directory traversal (`..`) is rejected so that nothing written
    /// from an archive can escape when the tree is materialized on the host.
    pub fn sanitize(raw_path: &str) -> Result<String, VfsError> {
        if raw_path.is_empty() {
            return Err(VfsError::InvalidPath("Empty path".to_string()));
        }

        let mut components = Vec::new();

        for component in Path::new(raw_path).components() {
            match component {
                Component::Prefix(_) => {
                    return Err(VfsError::InvalidPath(format!(
                        "Path prefix not allowed: {}",
                        raw_path
                    )));
                }
                Component::ParentDir => {
                    return Err(VfsError::InvalidPath(format!(
                        "Parent directory traversal not allowed: {}",
                        raw_path
                    )));
                }
                Component::RootDir | Component::CurDir => continue,
                Component::Normal(part) => {
                    let part_str = part.to_str().ok_or_else(|| {
                        VfsError::InvalidPath(format!("Invalid UTF-8 in path: {:?}", part))
                    })?;
                    components.push(part_str);
                }
            }
        }

        Ok(components.join("/"))
    }

    /// Parent key of an already-sanitized path (`""` for top-level entries)
    pub fn parent(normalized: &str) -> &str {
        normalized.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
    }
}
