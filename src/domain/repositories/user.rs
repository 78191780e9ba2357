use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::user::User;

#[derive(Debug, Error)]
pub enum UserRepositoryError {
    #[error("query return nothing")]
    NotFound,
    #[error("row already exists")]
    AlreadyExists,
    #[error("database return error: {0}")]
    DbError(#[from] sqlx::Error),
    #[error("other error: {0}")]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert_user(&self, user: User) -> Result<i64, UserRepositoryError>;

    async fn get_user_by_id(&self, id: i64) -> Result<User, UserRepositoryError>;

    async fn get_user_by_email(&self, email: String) -> Result<User, UserRepositoryError>;

    async fn update_email(&self, id: i64, email: String) -> Result<u64, UserRepositoryError>;

    async fn get_display_name(&self, user_id: i64) -> Result<String, UserRepositoryError>;

    async fn insert_display_name(
        &self,
        user_id: i64,
        name: String,
    ) -> Result<(), UserRepositoryError>;

    async fn update_display_name(
        &self,
        user_id: i64,
        name: String,
    ) -> Result<u64, UserRepositoryError>;
}
