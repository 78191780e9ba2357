use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoverRepositoryError {
    #[error("cover not found")]
    NotFound,
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Object storage for book cover images, keyed per user.
#[async_trait]
pub trait CoverRepository: Send + Sync {
    /// Stores a cover and returns the name of the stored object.
    async fn put(
        &self,
        user_id: i64,
        filename: &str,
        data: &[u8],
    ) -> Result<String, CoverRepositoryError>;

    async fn get(&self, user_id: i64, name: &str) -> Result<Vec<u8>, CoverRepositoryError>;
}
