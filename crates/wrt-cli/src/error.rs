use thiserror::Error;
use wrt_store::StoreError;
use wrt_types::WrtError;

/// Anything that ends a `wrt` invocation with a non-zero exit code.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Wrt(#[from] WrtError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Config error: {0}")]
    Config(String),
    #[error("{0}")]
    Usage(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}
