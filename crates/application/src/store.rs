use std::{future::Future, time::Duration};

use domain::RepositoryError;

/// 为存储调用加上超时，超时视为存储失败
pub(crate) async fn bounded<T, F>(limit: Duration, operation: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(RepositoryError::Timeout(limit)),
    }
}
