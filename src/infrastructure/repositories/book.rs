use crate::{
    domain::{
        entities::book::{Book, BookPatch, NewBook},
        repositories::book::{BookRepository, BookRepositoryError},
    },
    infrastructure::database::Pool,
};
use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::{sqlite::SqliteArguments, Arguments, Row, SqlitePool};
use tokio_stream::StreamExt;

#[derive(Clone)]
pub struct BookRepositoryImpl {
    pool: Pool,
}

impl BookRepositoryImpl {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn map_book(row: &sqlx::sqlite::SqliteRow) -> Book {
    Book {
        id: row.get(0),
        user_id: row.get(1),
        title: row.get(2),
        author: row.get(3),
        description: row.get(4),
        genre: row.get(5),
        cover_image: row.get(6),
        rating: row.get(7),
        started_reading_on: row.get(8),
        finished_reading_on: row.get(9),
        created_at: row.get(10),
    }
}

#[async_trait]
impl BookRepository for BookRepositoryImpl {
    async fn get_books_by_user_id(&self, user_id: i64) -> Result<Vec<Book>, BookRepositoryError> {
        let mut stream = sqlx::query(r#"SELECT * FROM books WHERE user_id = ? ORDER BY id"#)
            .bind(user_id)
            .fetch(&self.pool as &SqlitePool);

        let mut books = vec![];
        while let Some(row) = stream.try_next().await? {
            books.push(map_book(&row));
        }

        Ok(books)
    }

    async fn insert_books(
        &self,
        user_id: i64,
        books: &[NewBook],
    ) -> Result<(), BookRepositoryError> {
        for book in books {
            sqlx::query(
                r#"INSERT INTO books(
                    user_id,
                    title,
                    author,
                    description,
                    genre,
                    cover_image,
                    rating
                ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(user_id)
            .bind(&book.title)
            .bind(&book.author)
            .bind(&book.description)
            .bind(&book.genre)
            .bind(&book.cover_image)
            .bind(book.rating)
            .execute(&self.pool as &SqlitePool)
            .await?;
        }

        Ok(())
    }

    async fn update_book(
        &self,
        user_id: i64,
        book_id: i64,
        patch: &BookPatch,
    ) -> Result<u64, BookRepositoryError> {
        let (query, arguments) = build_update(user_id, book_id, patch)?;

        let rows_affected = sqlx::query_with(&query, arguments)
            .execute(&self.pool as &SqlitePool)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn delete_book(&self, user_id: i64, book_id: i64) -> Result<u64, BookRepositoryError> {
        let rows_affected = sqlx::query(r#"DELETE FROM books WHERE id = ? AND user_id = ?"#)
            .bind(book_id)
            .bind(user_id)
            .execute(&self.pool as &SqlitePool)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

fn add_argument<'q, T>(
    arguments: &mut SqliteArguments<'q>,
    value: T,
) -> Result<(), BookRepositoryError>
where
    T: 'q + sqlx::Encode<'q, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    arguments
        .add(value)
        .map_err(|e| BookRepositoryError::Other(anyhow!("{e}")))
}

fn build_update<'q>(
    user_id: i64,
    book_id: i64,
    patch: &BookPatch,
) -> Result<(String, SqliteArguments<'q>), BookRepositoryError> {
    let mut column_to_update = vec![];
    let mut arguments = SqliteArguments::default();

    if let Some(title) = &patch.title {
        column_to_update.push("title = ?");
        add_argument(&mut arguments, title.clone())?;
    }
    if let Some(author) = &patch.author {
        column_to_update.push("author = ?");
        add_argument(&mut arguments, author.clone())?;
    }
    if let Some(description) = &patch.description {
        column_to_update.push("description = ?");
        add_argument(&mut arguments, description.clone())?;
    }
    if let Some(genre) = &patch.genre {
        column_to_update.push("genre = ?");
        add_argument(&mut arguments, genre.clone())?;
    }
    if let Some(cover_image) = &patch.cover_image {
        column_to_update.push("cover_image = ?");
        add_argument(&mut arguments, cover_image.clone())?;
    }
    if let Some(rating) = patch.rating {
        column_to_update.push("rating = ?");
        add_argument(&mut arguments, rating)?;
    }
    if let Some(started) = patch.started_reading_on {
        column_to_update.push("started_reading_on = ?");
        add_argument(&mut arguments, started)?;
    }
    if let Some(finished) = patch.finished_reading_on {
        column_to_update.push("finished_reading_on = ?");
        add_argument(&mut arguments, finished)?;
    }

    if column_to_update.is_empty() {
        return Err(BookRepositoryError::Other(anyhow!("Nothing to update")));
    }

    add_argument(&mut arguments, book_id)?;
    add_argument(&mut arguments, user_id)?;

    let query = format!(
        r#"UPDATE books SET
            {}
            WHERE id = ? AND user_id = ?"#,
        column_to_update.join(",")
    );

    Ok((query, arguments))
}
