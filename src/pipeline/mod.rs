mod state;


pub use crate::config::Variant;
pub use state::PipelineState;

use crate::bridge::{BridgeError, ExecutionBridge, RunOutput, ShimConfig};
use crate::config::{PipelineConfig, ToolConfig};
use crate::error::{PipelineError, StageId};
use crate::fetch::{fetch_bytes, Location};
use crate::tool::{GuestTool, Stage, ToolError, WasiTool};
use reqwest::Client;
use state::RunTracker;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Everything a successful run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub output: RunOutput,
    /// States visited, starting at `Idle` and ending at `Done`
    pub states: Vec<PipelineState>,
}

/// Source text in, captured program output out.
///
/// A pipeline holds only configuration and tool handles. Every call loads
/// fresh guest instances and a fresh shim, so calls are independent of each
/// other and may run concurrently.
pub struct Pipeline {
    config: PipelineConfig,
    compiler: Arc<dyn GuestTool>,
    linker: Arc<dyn GuestTool>,
    bridge: ExecutionBridge,
    http: Client,
}

impl Pipeline {
    /// Pipeline whose compiler and linker are the WASI modules named in `config`
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let capacity = config.capture_capacity();
        let compiler = wasi_tool(&config.compiler(), StageId::Compile, capacity)?;
        let linker = wasi_tool(&config.linker(), StageId::Link, capacity)?;
        Ok(Self::with_tools(config, Arc::new(compiler), Arc::new(linker)))
    }

    /// Pipeline driving the given tools. The argument vectors and file
    /// names still come from `config`.
    pub fn with_tools(
        config: PipelineConfig,
        compiler: Arc<dyn GuestTool>,
        linker: Arc<dyn GuestTool>,
    ) -> Self {
        Self {
            config,
            compiler,
            linker,
            bridge: ExecutionBridge::new(),
            http: Client::new(),
        }
    }

    /// Compile, link and run `source`, returning what the program wrote to stdout.
    ///
    /// A program that exits with a non-zero status still yields its output;
    /// only a trap or an earlier stage failure is an error.
    pub async fn compile_and_run(&self, source: &str) -> Result<String, PipelineError> {
        let report = self.compile_and_run_detailed(source).await?;
        Ok(report.output.stdout_text())
    }

    /// Like [`Pipeline::compile_and_run`] but keeps stderr, the exit status
    /// and the visited states
    pub async fn compile_and_run_detailed(&self, source: &str) -> Result<RunReport, PipelineError> {
        let mut run = RunTracker::new();
        let run_id = run.run_id();
        let span = tracing::info_span!("compile_and_run", %run_id, variant = ?self.config.variant);

        let result = self.drive(source, &mut run).instrument(span.clone()).await;
        if let Err(err) = &result {
            span.in_scope(|| {
                tracing::warn!(state = %run.state(), stage = %err.stage(), "pipeline failed: {}", err)
            });
        }

        Ok(RunReport {
            run_id,
            output: result?,
            states: run.into_history(),
        })
    }

    /// Retrieve source text from a URL or path (relative ones resolve against `base_url`)
    pub async fn fetch_source(&self, location: &str) -> Result<String, PipelineError> {
        let location = Location::resolve(&self.config.base_url, location);
        tracing::info!(?location, "fetching source");
        let bytes = fetch_bytes(&self.http, &location)
            .await
            .map_err(|source| PipelineError::Network {
                stage: StageId::FetchSource,
                source,
            })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn drive(&self, source: &str, run: &mut RunTracker) -> Result<RunOutput, PipelineError> {
        let compiler = self.config.compiler();
        let linker = self.config.linker();

        run.advance(PipelineState::CompileInvoked);
        let object = Stage::new(StageId::Compile, Arc::clone(&self.compiler))
            .input(compiler.input, source.as_bytes())
            .args(compiler.args)
            .output(compiler.output)
            .run()
            .await?;
        run.advance(PipelineState::ObjectReady);

        let mut link = Stage::new(StageId::Link, Arc::clone(&self.linker))
            .input(linker.input, object)
            .args(linker.args)
            .output(linker.output.clone());

        if let Some(sysroot) = self.config.sysroot_location() {
            let location = Location::resolve(&self.config.base_url, &sysroot);
            tracing::info!(?location, "fetching sysroot");
            let archive = fetch_bytes(&self.http, &location)
                .await
                .map_err(|source| PipelineError::Network {
                    stage: StageId::FetchSysroot,
                    source,
                })?;
            run.advance(PipelineState::SysrootFetched);
            link = link.sysroot(Arc::new(archive));
        }

        run.advance(PipelineState::LinkInvoked);
        let module = link.run().await?;
        run.advance(PipelineState::ModuleReady);

        let bridge = self.bridge.clone();
        let shim = self.shim_config(&linker.output);
        let instance = tokio::task::spawn_blocking(move || bridge.prepare(&module)?.instantiate(&shim))
            .await
            .map_err(|e| BridgeError::Instantiate(format!("instantiation task failed: {}", e)))
            .and_then(|instance| instance)?;
        run.advance(PipelineState::Instantiated);

        let output = tokio::task::spawn_blocking(move || instance.run())
            .await
            .map_err(|e| BridgeError::ExecutionTrap(format!("execution task failed: {}", e)))
            .and_then(|output| output)?;
        run.advance(PipelineState::Ran);

        tracing::info!(
            exit_code = output.exit_code,
            stdout = output.stdout.len(),
            stderr = output.stderr.len(),
            "program finished"
        );
        run.advance(PipelineState::Done);
        Ok(output)
    }

    fn shim_config(&self, program_name: &str) -> ShimConfig {
        let shim = ShimConfig::new(program_name)
            .args(self.config.program_args.iter().cloned())
            .capture_capacity(self.config.capture_capacity());
        self.config
            .program_env
            .iter()
            .fold(shim, |shim, (key, value)| shim.env(key.clone(), value.clone()))
    }
}

fn wasi_tool(tool: &ToolConfig, stage: StageId, capacity: usize) -> Result<WasiTool, PipelineError> {
    let mut wasi = WasiTool::from_path(tool.program_name.clone(), tool.module.clone())
        .capture_capacity(capacity);

    if let Some(image) = &tool.image {
        let archive = std::fs::read(image).map_err(|e| {
            PipelineError::tool(
                stage,
                ToolError::Load {
                    tool: tool.program_name.clone(),
                    reason: format!("image {}: {}", image.display(), e),
                },
            )
        })?;
        wasi = wasi.image(archive);
    }

    Ok(wasi)
}
