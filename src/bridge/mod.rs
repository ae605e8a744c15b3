mod error;
mod shim;


pub use error::BridgeError;
pub use shim::{RunOutput, ShimConfig, DEFAULT_CAPTURE_CAPACITY};

use sha2::{Digest, Sha256};
use wasmtime::{Engine, Linker, Module, Store, TypedFunc};
use wasmtime_wasi::pipe::MemoryOutputPipe;
use wasmtime_wasi::preview1::{self, WasiP1Ctx};
use wasmtime_wasi::I32Exit;

/// Conventional command entry point
pub const ENTRY_POINT: &str = "_start";

/// Runs a finished module under a WASI shim and collects what it wrote.
///
/// Each run gets its own engine, store and shim; the bridge keeps no state
/// between runs.
#[derive(Debug, Clone, Default)]
pub struct ExecutionBridge;

impl ExecutionBridge {
    pub fn new() -> Self {
        Self
    }

    /// Validate, instantiate and run `module_bytes`.
    ///
    /// A `proc_exit` with any status is a normal completion and returns the
    /// captured output. Anything else that aborts execution is a trap.
    /// This blocks; use [`ExecutionBridge::run_blocking`] from async code.
    pub fn run(&self, module_bytes: &[u8], shim: &ShimConfig) -> Result<RunOutput, BridgeError> {
        self.prepare(module_bytes)?.run(shim)
    }

    /// Validate `module_bytes` on a fresh engine without running anything
    pub fn prepare(&self, module_bytes: &[u8]) -> Result<PreparedModule, BridgeError> {
        let engine = Engine::default();
        let module = self.compile(&engine, module_bytes)?;
        Ok(PreparedModule { engine, module })
    }

    /// [`ExecutionBridge::run`] on the blocking thread pool
    pub async fn run_blocking(
        &self,
        module_bytes: Vec<u8>,
        shim: ShimConfig,
    ) -> Result<RunOutput, BridgeError> {
        let bridge = self.clone();
        tokio::task::spawn_blocking(move || bridge.run(&module_bytes, &shim))
            .await
            .map_err(|e| BridgeError::ExecutionTrap(format!("execution task failed: {}", e)))?
    }

    /// Format validation step, separate so callers can fail before setting up a shim
    pub fn compile(&self, engine: &Engine, module_bytes: &[u8]) -> Result<Module, BridgeError> {
        tracing::debug!(
            size = module_bytes.len(),
            sha256 = %hex::encode(Sha256::digest(module_bytes)),
            "compiling module"
        );
        Module::from_binary(engine, module_bytes)
            .map_err(|e| BridgeError::ModuleFormat(format!("{:#}", e)))
    }
}

/// A validated module, ready to be run once or more against fresh shims
#[derive(Clone)]
pub struct PreparedModule {
    engine: Engine,
    module: Module,
}

impl PreparedModule {
    /// Bind the module's imports to a fresh shim and create its instance.
    /// Fails if an import cannot be resolved or `_start` is missing.
    pub fn instantiate(&self, shim: &ShimConfig) -> Result<InstantiatedModule, BridgeError> {
        instantiate(&self.engine, &self.module, shim)
    }

    /// Instantiate and run in one step. Blocking, like [`ExecutionBridge::run`]
    pub fn run(&self, shim: &ShimConfig) -> Result<RunOutput, BridgeError> {
        self.instantiate(shim)?.run()
    }
}

/// A live instance with its own store and shim, not yet started
pub struct InstantiatedModule {
    store: Store<WasiP1Ctx>,
    start: TypedFunc<(), ()>,
    stdout: MemoryOutputPipe,
    stderr: MemoryOutputPipe,
}

impl InstantiatedModule {
    /// Call the entry point and collect the captured output. Consumes the
    /// instance; a module runs at most once.
    pub fn run(mut self) -> Result<RunOutput, BridgeError> {
        let exit_code = match self.start.call(&mut self.store, ()) {
            Ok(()) => 0,
            Err(err) => match err.downcast_ref::<I32Exit>() {
                Some(exit) => exit.0,
                None => {
                    tracing::debug!(error = %format!("{:#}", err), "module trapped");
                    return Err(BridgeError::ExecutionTrap(format!("{:#}", err)));
                }
            },
        };
        drop(self.store);

        Ok(RunOutput {
            stdout: self.stdout.contents().to_vec(),
            stderr: self.stderr.contents().to_vec(),
            exit_code,
        })
    }
}

fn instantiate(
    engine: &Engine,
    module: &Module,
    shim: &ShimConfig,
) -> Result<InstantiatedModule, BridgeError> {
    let shim_state = shim.build()?;

    let mut linker: Linker<WasiP1Ctx> = Linker::new(engine);
    preview1::add_to_linker_sync(&mut linker, |cx| cx)
        .map_err(|e| BridgeError::Shim(format!("{:#}", e)))?;

    let mut store = Store::new(engine, shim_state.ctx);
    let instance = linker
        .instantiate(&mut store, module)
        .map_err(|e| BridgeError::Instantiate(format!("{:#}", e)))?;

    let start = instance
        .get_typed_func::<(), ()>(&mut store, ENTRY_POINT)
        .map_err(|_| BridgeError::MissingEntryPoint(ENTRY_POINT.to_string()))?;

    Ok(InstantiatedModule {
        store,
        start,
        stdout: shim_state.stdout,
        stderr: shim_state.stderr,
    })
}

/// Instantiate an already compiled module against a fresh shim and call its entry point
pub(crate) fn run_module(
    engine: &Engine,
    module: &Module,
    shim: &ShimConfig,
) -> Result<RunOutput, BridgeError> {
    instantiate(engine, module, shim)?.run()
}
