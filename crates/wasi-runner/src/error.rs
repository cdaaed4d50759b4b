//! Error types for the runner crate.

use thiserror::Error;

/// Runner error type
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Module bytes failed to compile (malformed or unsupported binary)
    #[error("invalid module: {0}")]
    InvalidModule(String),

    /// Module could not be linked or instantiated against the WASI host
    #[error("instantiation failed: {0}")]
    InstantiationFailed(String),

    /// A stdio channel could not be allocated or seeded
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The guest wrote to its error stream
    #[error("guest reported error: {0}")]
    GuestReportedError(String),

    /// The guest faulted at the runtime level
    #[error("guest trapped: {0}")]
    GuestTrap(String),

    /// The cancellation signal fired before the guest finished
    #[error("execution cancelled")]
    Cancelled,

    /// Engine or configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl RunnerError {
    /// Whether the error was raised before the guest started executing.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            RunnerError::InvalidModule(_)
                | RunnerError::InstantiationFailed(_)
                | RunnerError::Io(_)
                | RunnerError::Config(_)
        )
    }
}

/// Result type alias for runner operations
pub type Result<T> = std::result::Result<T, RunnerError>;
