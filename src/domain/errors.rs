use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Payload too large: {0}")]
    TooLarge(String),
    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Wraps a `spawn_blocking` join failure (panic or cancellation).
    pub fn from_join(stage: &str, err: tokio::task::JoinError) -> Self {
        DomainError::OperationFailed(format!("{stage} task aborted: {err}"))
    }
}
