use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad magic in {file}: expected {expected:?}, found {found:?}")]
    BadMagic { file: &'static str, expected: [u8; 4], found: [u8; 4] },

    #[error("{file} is truncated: expected at least {expected} bytes, found {found}")]
    Truncated { file: &'static str, expected: usize, found: usize },

    #[error("checksum mismatch in {file}: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { file: &'static str, expected: u32, computed: u32 },

    #[error("writer is in state {state:?}, which does not allow {attempted}")]
    BadState { state: &'static str, attempted: &'static str },

    #[error("serializing manifest failed: {0}")]
    Manifest(#[from] serde_json::Error),
}
