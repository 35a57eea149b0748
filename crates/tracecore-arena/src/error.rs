use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("arena I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arena magic mismatch: expected {expected:#010x}, found {found:#010x}")]
    MagicMismatch { expected: u32, found: u32 },

    #[error("arena version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("arena size mismatch: header declares {declared}, mapping is {actual}")]
    SizeMismatch { declared: u64, actual: u64 },

    #[error("arena too small to hold the control header: {size} < {min}")]
    TooSmall { size: u64, min: u64 },

    #[error("offset {offset} out of bounds for arena of size {size}")]
    OffsetOutOfBounds { offset: u64, size: u64 },
}
