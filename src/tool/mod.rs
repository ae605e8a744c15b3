mod error;
mod stage;
mod wasi;

#[cfg(test)]
pub(crate) mod scripted;
#[cfg(test)]
mod tests;

pub use error::ToolError;
pub use stage::Stage;
pub use wasi::{WasiInstance, WasiTool};

use crate::vfs::FileSystem;
use async_trait::async_trait;
use std::fmt;

/// Completion status of one tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus(pub i32);

impl ExitStatus {
    pub const SUCCESS: ExitStatus = ExitStatus(0);

    pub fn success(&self) -> bool {
        self.0 == 0
    }

    pub fn code(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An external compiler or linker that can be started as an isolated guest.
///
/// Every `load` must hand out a brand-new instance with its own filesystem;
/// instances are never pooled or shared.
#[async_trait]
pub trait GuestTool: Send + Sync {
    /// Name used in logs and errors (e.g., "llc")
    fn name(&self) -> &str;

    /// Start a fresh instance
    async fn load(&self) -> Result<Box<dyn GuestInstance>, ToolError>;
}

/// One running guest: a sandboxed filesystem plus an entry point
#[async_trait]
pub trait GuestInstance: FileSystem + Send {
    /// Run the tool's entry point with `args` (without `argv[0]`)
    async fn invoke(&mut self, args: &[String]) -> Result<ExitStatus, ToolError>;

    /// Diagnostic output (stderr) of the last invocation
    fn diagnostics(&self) -> String {
        String::new()
    }
}
