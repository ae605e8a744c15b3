use crate::bridge::DEFAULT_CAPTURE_CAPACITY;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fixed retrieval path of the runtime sysroot, relative to `base_url`
pub const DEFAULT_SYSROOT_PATH: &str = "sysroot.tar";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// What kind of source text the pipeline accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// C source; the linker's sysroot is baked into its image
    C,
    /// LLVM IR assembly; the sysroot is fetched and unpacked into the linker
    #[default]
    Ir,
}

/// How to start one guest tool and what it reads and writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Path to the WASI command module
    pub module: PathBuf,
    /// `argv[0]`
    pub program_name: String,
    pub args: Vec<String>,
    /// File the stage's input is written to
    pub input: String,
    /// File read back after the tool exits
    pub output: String,
    /// Archive baked into the tool's filesystem on every load
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
}

impl ToolConfig {
    fn new(module: &str, program_name: &str, args: &[&str], input: &str, output: &str) -> Self {
        Self {
            module: PathBuf::from(module),
            program_name: program_name.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            input: input.to_string(),
            output: output.to_string(),
            image: None,
        }
    }

    /// `llc` lowering IR assembly to an object file
    pub fn llc() -> Self {
        Self::new("llc.wasm", "llc", &["-filetype=obj", "main.ll"], "main.ll", "main.o")
    }

    /// `lld` linking against the unpacked wasm32-wasi sysroot
    pub fn lld() -> Self {
        Self::new(
            "lld.wasm",
            "lld",
            &[
                "-flavor",
                "wasm",
                "-L/lib/wasm32-wasi",
                "-lc",
                "-lc++",
                "-lc++abi",
                "/lib/clang/11.1.0/lib/wasi/libclang_rt.builtins-wasm32.a",
                "/lib/wasm32-wasi/crt1.o",
                "main.o",
                "-o",
                "main.wasm",
            ],
            "main.o",
            "main.wasm",
        )
    }

    /// `clang` compiling C against the headers in its own image
    pub fn clang() -> Self {
        Self::new(
            "clang.wasm",
            "clang",
            &[
                "--target=wasm32-wasi",
                "--sysroot=/",
                "-O2",
                "-c",
                "main.c",
                "-o",
                "main.o",
            ],
            "main.c",
            "main.o",
        )
    }

    /// `wasm-ld` linking against the libraries in its own image
    pub fn wasm_ld() -> Self {
        Self::new(
            "wasm-ld.wasm",
            "wasm-ld",
            &[
                "-L/lib/wasm32-wasi",
                "-lc",
                "/lib/wasm32-wasi/crt1.o",
                "main.o",
                "-o",
                "main.wasm",
            ],
            "main.o",
            "main.wasm",
        )
    }
}

/// Everything `compile_and_run` needs besides the source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub variant: Variant,
    /// Overrides the variant's default compiler
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<ToolConfig>,
    /// Overrides the variant's default linker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linker: Option<ToolConfig>,
    /// Sysroot archive location (URL or path); IR variant only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sysroot: Option<String>,
    /// Base URL or directory that relative locations resolve against
    pub base_url: String,
    /// Max bytes captured from the program's stdout and stderr (each)
    pub capture_capacity: Option<usize>,
    /// Extra arguments passed to the compiled program after `argv[0]`
    pub program_args: Vec<String>,
    pub program_env: Vec<(String, String)>,
}

impl PipelineConfig {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn compiler(&self) -> ToolConfig {
        self.compiler.clone().unwrap_or_else(|| match self.variant {
            Variant::C => ToolConfig::clang(),
            Variant::Ir => ToolConfig::llc(),
        })
    }

    pub fn linker(&self) -> ToolConfig {
        self.linker.clone().unwrap_or_else(|| match self.variant {
            Variant::C => ToolConfig::wasm_ld(),
            Variant::Ir => ToolConfig::lld(),
        })
    }

    /// Sysroot to fetch before linking, if the variant uses one
    pub fn sysroot_location(&self) -> Option<String> {
        match self.variant {
            Variant::C => None,
            Variant::Ir => Some(
                self.sysroot
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SYSROOT_PATH.to_string()),
            ),
        }
    }

    pub fn capture_capacity(&self) -> usize {
        self.capture_capacity.unwrap_or(DEFAULT_CAPTURE_CAPACITY)
    }
}
