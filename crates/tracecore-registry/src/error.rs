use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry is at capacity ({max} threads already registered)")]
    Capacity { max: usize },
}
