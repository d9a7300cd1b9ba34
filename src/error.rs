use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("media backend unavailable: {0}")]
    Unavailable(String),
    #[error("media backend I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}
