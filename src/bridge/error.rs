use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Not a valid WebAssembly module: {0}")]
    ModuleFormat(String),

    #[error("Failed to instantiate module: {0}")]
    Instantiate(String),

    #[error("Module does not export a `{0}` entry point")]
    MissingEntryPoint(String),

    #[error("Module trapped: {0}")]
    ExecutionTrap(String),

    #[error("Failed to set up system interface: {0}")]
    Shim(String),
}
