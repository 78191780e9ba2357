use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::book::{Book, BookPatch, NewBook};

#[derive(Debug, Error)]
pub enum BookRepositoryError {
    #[error("query return nothing")]
    NotFound,
    #[error("database return error: {0}")]
    DbError(#[from] sqlx::Error),
    #[error("other error: {0}")]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn get_books_by_user_id(&self, user_id: i64) -> Result<Vec<Book>, BookRepositoryError>;

    async fn insert_books(
        &self,
        user_id: i64,
        books: &[NewBook],
    ) -> Result<(), BookRepositoryError>;

    /// Updates the columns set in `patch` on the book owned by `user_id`.
    /// Returns the number of affected rows.
    async fn update_book(
        &self,
        user_id: i64,
        book_id: i64,
        patch: &BookPatch,
    ) -> Result<u64, BookRepositoryError>;

    async fn delete_book(&self, user_id: i64, book_id: i64) -> Result<u64, BookRepositoryError>;
}
