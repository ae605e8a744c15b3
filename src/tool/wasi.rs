use super::{ExitStatus, GuestInstance, GuestTool, ToolError};
use crate::archive::extract_into;
use crate::bridge::{self, BridgeError, ShimConfig};
use crate::vfs::{FileSystem, VfsError, VirtualFs};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use wasmtime::{Engine, Module};

#[derive(Debug, Clone)]
enum ModuleSource {
    Path(PathBuf),
    Bytes(Arc<Vec<u8>>),
}

/// A compiler or linker built as a WASI command module.
///
/// Loading compiles the module on a fresh engine and gives the instance an
/// empty [`VirtualFs`], or one pre-populated from the tool's baked image
/// archive (e.g. a clang build that ships its own sysroot).
#[derive(Debug, Clone)]
pub struct WasiTool {
    name: String,
    program_name: String,
    source: ModuleSource,
    image: Option<Arc<Vec<u8>>>,
    capture_capacity: usize,
}

impl WasiTool {
    /// Tool whose module is read from disk on every load
    pub fn from_path(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::with_source(name.into(), ModuleSource::Path(path.into()))
    }

    /// Tool whose module bytes are already in memory
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::with_source(name.into(), ModuleSource::Bytes(Arc::new(bytes)))
    }

    fn with_source(name: String, source: ModuleSource) -> Self {
        Self {
            program_name: name.clone(),
            name,
            source,
            image: None,
            capture_capacity: bridge::DEFAULT_CAPTURE_CAPACITY,
        }
    }

    /// `argv[0]` passed to the tool (defaults to its name)
    pub fn program_name(mut self, program_name: impl Into<String>) -> Self {
        self.program_name = program_name.into();
        self
    }

    /// Archive unpacked into every new instance's filesystem before anything else
    pub fn image(mut self, archive: Vec<u8>) -> Self {
        self.image = Some(Arc::new(archive));
        self
    }

    pub fn capture_capacity(mut self, capacity: usize) -> Self {
        self.capture_capacity = capacity;
        self
    }

    async fn module_bytes(&self) -> Result<Arc<Vec<u8>>, ToolError> {
        match &self.source {
            ModuleSource::Bytes(bytes) => Ok(Arc::clone(bytes)),
            ModuleSource::Path(path) => tokio::fs::read(path).await.map(Arc::new).map_err(|e| {
                ToolError::Load {
                    tool: self.name.clone(),
                    reason: format!("{}: {}", path.display(), e),
                }
            }),
        }
    }
}

#[async_trait]
impl GuestTool for WasiTool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<Box<dyn GuestInstance>, ToolError> {
        let bytes = self.module_bytes().await?;

        let tool = self.name.clone();
        let (engine, module) = tokio::task::spawn_blocking(move || {
            let engine = Engine::default();
            let module = Module::from_binary(&engine, &bytes);
            module.map(|module| (engine, module))
        })
        .await
        .map_err(|e| ToolError::Load {
            tool: tool.clone(),
            reason: e.to_string(),
        })?
        .map_err(|e| ToolError::Load {
            tool: tool.clone(),
            reason: format!("{:#}", e),
        })?;

        let mut fs = VirtualFs::new();
        if let Some(image) = &self.image {
            let summary = extract_into(image, &mut fs).map_err(|source| ToolError::Image {
                tool: tool.clone(),
                source,
            })?;
            tracing::debug!(tool = %tool, files = summary.files, "unpacked tool image");
        }

        Ok(Box::new(WasiInstance {
            tool,
            program_name: self.program_name.clone(),
            engine,
            module,
            fs,
            capture_capacity: self.capture_capacity,
            last_stderr: Vec::new(),
        }))
    }
}

/// A loaded [`WasiTool`] with its private filesystem
pub struct WasiInstance {
    tool: String,
    program_name: String,
    engine: Engine,
    module: Module,
    fs: VirtualFs,
    capture_capacity: usize,
    last_stderr: Vec<u8>,
}

#[async_trait]
impl GuestInstance for WasiInstance {
    /// Sync the virtual filesystem to a scratch directory, run the command
    /// with that directory preopened as `/`, then read the directory back.
    async fn invoke(&mut self, args: &[String]) -> Result<ExitStatus, ToolError> {
        let invoke_err = |reason: String| ToolError::Invoke {
            tool: self.tool.clone(),
            reason,
        };

        let workdir = tempfile::tempdir().map_err(|e| invoke_err(e.to_string()))?;
        self.fs.materialize(workdir.path())?;

        let shim = ShimConfig::new(self.program_name.clone())
            .args(args.iter().cloned())
            .capture_capacity(self.capture_capacity)
            .preopen_dir(workdir.path());
        let engine = self.engine.clone();
        let module = self.module.clone();

        let result = tokio::task::spawn_blocking(move || bridge::run_module(&engine, &module, &shim))
            .await
            .map_err(|e| invoke_err(e.to_string()))?;

        let output = match result {
            Ok(output) => output,
            Err(BridgeError::ExecutionTrap(reason)) => {
                return Err(ToolError::Trapped {
                    tool: self.tool.clone(),
                    reason,
                })
            }
            Err(other) => return Err(invoke_err(other.to_string())),
        };

        self.fs.absorb(workdir.path())?;
        self.last_stderr = output.stderr;

        Ok(ExitStatus(output.exit_code))
    }

    fn diagnostics(&self) -> String {
        String::from_utf8_lossy(&self.last_stderr).into_owned()
    }
}

impl FileSystem for WasiInstance {
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
