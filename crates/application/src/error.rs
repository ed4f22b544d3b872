use domain::{DomainError, RepositoryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ApplicationError {
    /// 存储不可用、超时等需要以 5xx 返回的错误
    pub fn is_internal(&self) -> bool {
        !matches!(
            self,
            ApplicationError::Domain(_) | ApplicationError::Repository(RepositoryError::Conflict)
        )
    }
}
