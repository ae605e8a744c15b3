use thiserror::Error;

#[derive(Error, Debug)]
pub enum VfsError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("No such file or directory: {0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Is a directory: {0}")]
    IsADirectory(String),

    #[error("Parent directory does not exist: {0}")]
    MissingParent(String),

    #[error("Host filesystem error at {path}: {source}")]
    Host {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
