//! In-process guest tool driven by a closure, for tests

use super::{ExitStatus, GuestInstance, GuestTool, ToolError};
use crate::vfs::{FileSystem, VfsError, VirtualFs};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Script = dyn Fn(&mut VirtualFs, &[String]) -> i32 + Send + Sync;

/// In-process stand-in for a compiler/linker guest
pub(crate) struct ScriptedTool {
    name: String,
    script: Arc<Script>,
    loads: AtomicUsize,
}

impl ScriptedTool {
    pub(crate) fn new(
        name: &str,
        script: impl Fn(&mut VirtualFs, &[String]) -> i32 + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script: Arc::new(script),
            loads: AtomicUsize::new(0),
        })
    }

    /// How many instances have been loaded so far
    pub(crate) fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

struct ScriptedInstance {
    fs: VirtualFs,
    script: Arc<Script>,
}

#[async_trait]
impl GuestTool for ScriptedTool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<Box<dyn GuestInstance>, ToolError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedInstance {
            fs: VirtualFs::new(),
            script: Arc::clone(&self.script),
        }))
    }
}

#[async_trait]
impl GuestInstance for ScriptedInstance {
    async fn invoke(&mut self, args: &[String]) -> Result<ExitStatus, ToolError> {
        Ok(ExitStatus((self.script)(&mut self.fs, args)))
    }

    fn diagnostics(&self) -> String {
        "scripted failure".to_string()
    }
}

impl FileSystem for ScriptedInstance {
    fn write_file(&mut self, path: &str, data: &[u8]) -> Result<(), VfsError> {
        self.fs.write_file(path, data)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        self.fs.read_file(path)
    }

    fn mkdir(&mut self, path: &str) -> Result<(), VfsError> {
        self.fs.mkdir(path)
    }

    fn exists(&self, path: &str) -> bool {
        self.fs.exists(path)
    }

    fn is_dir(&self, path: &str) -> bool {
        self.fs.is_dir(path)
    }
}
