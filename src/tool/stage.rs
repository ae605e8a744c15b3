use super::{GuestTool, ToolError};
use crate::archive::{extract_into, ExtractError};
use crate::error::{PipelineError, StageId};
use std::sync::Arc;

/// One compile or link step: load a guest, feed it inputs, invoke it, read back its output
pub struct Stage {
    id: StageId,
    tool: Arc<dyn GuestTool>,
    inputs: Vec<(String, Vec<u8>)>,
    sysroot: Option<Arc<Vec<u8>>>,
    args: Vec<String>,
    output: String,
}

impl Stage {
    pub fn new(id: StageId, tool: Arc<dyn GuestTool>) -> Self {
        Self {
            id,
            tool,
            inputs: Vec::new(),
            sysroot: None,
            args: Vec::new(),
            output: String::new(),
        }
    }

    /// Pre-populate a file in the guest's filesystem
    pub fn input(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.inputs.push((path.into(), bytes.into()));
        self
    }

    /// Archive unpacked into the guest's filesystem after the inputs and before invocation
    pub fn sysroot(mut self, archive: Arc<Vec<u8>>) -> Self {
        self.sysroot = Some(archive);
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Path read back after a successful invocation
    pub fn output(mut self, path: impl Into<String>) -> Self {
        self.output = path.into();
        self
    }

    /// Run the stage on a fresh guest instance and return the output file's bytes
    pub async fn run(&self) -> Result<Vec<u8>, PipelineError> {
        let tool_name = self.tool.name().to_string();
        tracing::info!(stage = %self.id, tool = %tool_name, "starting stage");

        let mut instance = self
            .tool
            .load()
            .await
            .map_err(|e| PipelineError::tool(self.id, e))?;

        for (path, bytes) in &self.inputs {
            instance
                .write_file(path, bytes)
                .map_err(|e| PipelineError::tool(self.id, e))?;
        }

        if let Some(archive) = &self.sysroot {
            let summary = extract_into(archive, instance.as_mut()).map_err(|e| match e {
                ExtractError::Archive(source) => PipelineError::Archive {
                    stage: StageId::ExtractSysroot,
                    source,
                },
                ExtractError::Filesystem { source, .. } => {
                    PipelineError::tool(StageId::ExtractSysroot, source)
                }
            })?;
            tracing::info!(
                stage = %StageId::ExtractSysroot,
                files = summary.files,
                directories = summary.directories,
                bytes = summary.bytes,
                "sysroot extracted"
            );
        }

        let status = instance
            .invoke(&self.args)
            .await
            .map_err(|e| PipelineError::tool(self.id, e))?;

        if !status.success() {
            let diagnostics = instance.diagnostics();
            tracing::warn!(stage = %self.id, tool = %tool_name, status = status.code(), "{}", diagnostics);
            return Err(PipelineError::tool(
                self.id,
                ToolError::NonZeroExit {
                    tool: tool_name,
                    status: status.code(),
                    diagnostics,
                },
            ));
        }

        if !instance.exists(&self.output) || instance.is_dir(&self.output) {
            return Err(PipelineError::tool(
                self.id,
                ToolError::MissingOutput {
                    tool: tool_name,
                    path: self.output.clone(),
                },
            ));
        }

        let output = instance
            .read_file(&self.output)
            .map_err(|e| PipelineError::tool(self.id, e))?;

        tracing::info!(stage = %self.id, output = %self.output, size = output.len(), "stage finished");
        Ok(output)
    }
}
