mod error;
mod path;


pub use error::VfsError;
pub use path::PathSanitizer;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// The filesystem capability a guest tool exposes to the pipeline
pub trait FileSystem {
    /// Create or overwrite a file. The parent directory must already exist.
    fn write_file(&mut self, path: &str, data: &[u8]) -> Result<(), VfsError>;

    /// Read a whole file
    fn read_file(&self, path: &str) -> Result<Vec<u8>, VfsError>;

    /// Create a directory. Creating one that already exists is a no-op.
    fn mkdir(&mut self, path: &str) -> Result<(), VfsError>;

    /// Whether anything (file or directory) lives at `path`
    fn exists(&self, path: &str) -> bool;

    /// Whether `path` is a directory
    fn is_dir(&self, path: &str) -> bool;
}

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
}

/// In-memory sandboxed filesystem owned by one guest tool instance
#[derive(Debug, Clone, Default)]
pub struct VirtualFs {
    /// Normalized path -> node. The root (`""`) is implicit.
    nodes: BTreeMap<String, Node>,
}

/// Metadata for a single file in the virtual filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry<'a> {
    /// Normalized path (e.g., "lib/wasm32-wasi/libc.a")
    pub virtual_path: &'a str,
    /// Length in bytes
    pub length: usize,
}

impl VirtualFs {
    /// Create an empty filesystem containing only the root directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a file's contents as a byte slice (zero-copy)
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        let key = PathSanitizer::sanitize(path).ok()?;
        match self.nodes.get(&key) {
            Some(Node::File(data)) => Some(data),
            _ => None,
        }
    }

    /// List all files in path order
    pub fn list(&self) -> impl Iterator<Item = FileEntry<'_>> {
        self.nodes.iter().filter_map(|(path, node)| match node {
            Node::File(data) => Some(FileEntry {
                virtual_path: path.as_str(),
                length: data.len(),
            }),
            Node::Dir => None,
        })
    }

    /// Get the total number of files
    pub fn file_count(&self) -> usize {
        self.list().count()
    }

    /// Get the total number of directories, excluding the root
    pub fn dir_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| matches!(node, Node::Dir))
            .count()
    }

    /// Get the total payload size in bytes
    pub fn total_size(&self) -> usize {
        self.list().map(|entry| entry.length).sum()
    }

    /// Write the whole tree under `root` on the host filesystem
    pub fn materialize(&self, root: &Path) -> Result<(), VfsError> {
        // BTreeMap order puts every directory before its children
        for (path, node) in &self.nodes {
            let host_path = root.join(path);
            let result = match node {
                Node::Dir => fs::create_dir_all(&host_path),
                Node::File(data) => fs::write(&host_path, data),
            };
            result.map_err(|source| VfsError::Host {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Replace the tree with the contents of `root` on the host filesystem
    pub fn absorb(&mut self, root: &Path) -> Result<(), VfsError> {
        let mut nodes = BTreeMap::new();

        for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
            let entry = entry.map_err(|e| VfsError::Host {
                path: root.display().to_string(),
                source: e.into(),
            })?;

            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .to_string();
            let key = PathSanitizer::sanitize(&relative)?;

            if entry.file_type().is_dir() {
                nodes.insert(key, Node::Dir);
            } else if entry.file_type().is_file() {
                let data = fs::read(entry.path()).map_err(|source| VfsError::Host {
                    path: key.clone(),
                    source,
                })?;
                nodes.insert(key, Node::File(data));
            }
        }

        self.nodes = nodes;
        Ok(())
    }

    fn require_parent_dir(&self, key: &str) -> Result<(), VfsError> {
        let parent = PathSanitizer::parent(key);
        if parent.is_empty() {
            return Ok(());
        }
        match self.nodes.get(parent) {
            Some(Node::Dir) => Ok(()),
            Some(Node::File(_)) => Err(VfsError::NotADirectory(parent.to_string())),
            None => Err(VfsError::MissingParent(key.to_string())),
        }
    }
}

impl FileSystem for VirtualFs {
    fn write_file(&mut self, path: &str, data: &[u8]) -> Result<(), VfsError> {
        let key = PathSanitizer::sanitize(path)?;
        if key.is_empty() || matches!(self.nodes.get(&key), Some(Node::Dir)) {
            return Err(VfsError::IsADirectory(path.to_string()));
        }
        self.require_parent_dir(&key)?;
        self.nodes.insert(key, Node::File(data.to_vec()));
        Ok(())
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        let key = PathSanitizer::sanitize(path)?;
        match self.nodes.get(&key) {
            Some(Node::File(data)) => Ok(data.clone()),
            Some(Node::Dir) => Err(VfsError::IsADirectory(path.to_string())),
            None if key.is_empty() => Err(VfsError::IsADirectory(path.to_string())),
            None => Err(VfsError::NotFound(path.to_string())),
        }
    }

    fn mkdir(&mut self, path: &str) -> Result<(), VfsError> {
        let key = PathSanitizer::sanitize(path)?;
        match self.nodes.get(&key) {
            _ if key.is_empty() => Ok(()),
            Some(Node::Dir) => Ok(()),
            Some(Node::File(_)) => Err(VfsError::NotADirectory(path.to_string())),
            None => {
                self.require_parent_dir(&key)?;
                self.nodes.insert(key, Node::Dir);
                Ok(())
            }
        }
    }

    fn exists(&self, path: &str) -> bool {
        match PathSanitizer::sanitize(path) {
            Ok(key) => key.is_empty() || self.nodes.contains_key(&key),
            Err(_) => false,
        }
    }

    fn is_dir(&self, path: &str) -> bool {
        match PathSanitizer::sanitize(path) {
            Ok(key) => key.is_empty() || matches!(self.nodes.get(&key), Some(Node::Dir)),
            Err(_) => false,
        }
    }
}
