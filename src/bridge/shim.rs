use super::BridgeError;
use std::path::PathBuf;
use wasmtime_wasi::pipe::{MemoryInputPipe, MemoryOutputPipe};
use wasmtime_wasi::preview1::WasiP1Ctx;
use wasmtime_wasi::{DirPerms, FilePerms, WasiCtxBuilder};

/// Default cap on captured bytes per output stream (16 MiB)
pub const DEFAULT_CAPTURE_CAPACITY: usize = 16 * 1024 * 1024;

/// Recipe for the system-interface shim handed to one module run.
///
/// Every run builds a fresh WASI preview1 context from this, so nothing a
/// module does survives into the next run.
#[derive(Debug, Clone)]
pub struct ShimConfig {
    /// `argv[0]`
    pub program_name: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub stdin: Vec<u8>,
    /// Max bytes captured from each of stdout and stderr
    pub capture_capacity: usize,
    /// Host directory exposed to the module as `/` and `.`
    pub preopen_dir: Option<PathBuf>,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            program_name: "main.wasm".to_string(),
            args: Vec::new(),
            env: Vec::new(),
            stdin: Vec::new(),
            capture_capacity: DEFAULT_CAPTURE_CAPACITY,
            preopen_dir: None,
        }
    }
}

impl ShimConfig {
    pub fn new(program_name: impl Into<String>) -> Self {
        Self {
            program_name: program_name.into(),
            ..Self::default()
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, stdin: impl Into<Vec<u8>>) -> Self {
        self.stdin = stdin.into();
        self
    }

    pub fn capture_capacity(mut self, capacity: usize) -> Self {
        self.capture_capacity = capacity;
        self
    }

    pub fn preopen_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.preopen_dir = Some(dir.into());
        self
    }

    /// Build a fresh WASI context plus handles on its captured output
    pub(crate) fn build(&self) -> Result<Shim, BridgeError> {
        let stdout = MemoryOutputPipe::new(self.capture_capacity);
        let stderr = MemoryOutputPipe::new(self.capture_capacity);

        let mut builder = WasiCtxBuilder::new();
        builder.arg(&self.program_name);
        for arg in &self.args {
            builder.arg(arg);
        }
        for (key, value) in &self.env {
            builder.env(key, value);
        }
        builder
            .stdin(MemoryInputPipe::new(self.stdin.clone()))
            .stdout(stdout.clone())
            .stderr(stderr.clone());

        if let Some(dir) = &self.preopen_dir {
            for guest_path in ["/", "."] {
                builder
                    .preopened_dir(dir, guest_path, DirPerms::all(), FilePerms::all())
                    .map_err(|e| {
                        BridgeError::Shim(format!("preopen {} as {}: {:#}", dir.display(), guest_path, e))
                    })?;
            }
        }

        Ok(Shim {
            ctx: builder.build_p1(),
            stdout,
            stderr,
        })
    }
}

pub(crate) struct Shim {
    pub ctx: WasiP1Ctx,
    pub stdout: MemoryOutputPipe,
    pub stderr: MemoryOutputPipe,
}

/// What a module left behind after running to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Status passed to `proc_exit`, or 0 when the entry point returned
    pub exit_code: i32,
}

impl RunOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
