use thiserror::Error;

/// Collector-level errors. Per-concern crates own their own error enum
/// (`ArenaError`, `RegistryError`, `WriteError`); this enum wraps the ones
/// that can surface at session boundaries, plus the purely ambient cases
/// (startup timeout, config validation) introduced by this layer.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Registry(#[from] tracecore_registry::RegistryError),

    #[error(transparent)]
    Write(#[from] tracecore_writer::WriteError),

    #[error("session startup did not complete within {0:?}")]
    StartupTimeout(std::time::Duration),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SessionError {
    /// Process exit code per the drain process's exit-code contract.
    pub fn exit_code(&self) -> i32 {
        match self {
            SessionError::InvalidConfig(_) => 1,
            SessionError::Registry(_) => 2,
            SessionError::StartupTimeout(_) => 3,
            SessionError::Write(_) | SessionError::Io(_) => 4,
        }
    }
}
