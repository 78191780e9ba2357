use crate::{
    domain::{
        entities::user::User,
        repositories::user::{UserRepository, UserRepositoryError},
    },
    infrastructure::database::Pool,
};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

#[derive(Clone)]
pub struct UserRepositoryImpl {
    pool: Pool,
}

impl UserRepositoryImpl {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn map_user(row: sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get(0),
        email: row.get(1),
        password: row.get(2),
        created_at: row.get(3),
        updated_at: row.get(4),
    }
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn insert_user(&self, user: User) -> Result<i64, UserRepositoryError> {
        let result = sqlx::query(
            r#"INSERT INTO user(
                email,
                password
            ) VALUES (?, ?)"#,
        )
        .bind(&user.email)
        .bind(&user.password)
        .execute(&self.pool as &SqlitePool)
        .await;

        match result {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(UserRepositoryError::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user_by_id(&self, id: i64) -> Result<User, UserRepositoryError> {
        let row = sqlx::query(r#"SELECT * FROM user WHERE id = ?"#)
            .bind(id)
            .fetch_optional(&self.pool as &SqlitePool)
            .await?
            .ok_or(UserRepositoryError::NotFound)?;

        Ok(map_user(row))
    }

    async fn get_user_by_email(&self, email: String) -> Result<User, UserRepositoryError> {
        let row = sqlx::query(r#"SELECT * FROM user WHERE email = ?"#)
            .bind(&email)
            .fetch_optional(&self.pool as &SqlitePool)
            .await?
            .ok_or(UserRepositoryError::NotFound)?;

        Ok(map_user(row))
    }

    async fn update_email(&self, id: i64, email: String) -> Result<u64, UserRepositoryError> {
        let result = sqlx::query(
            r#"UPDATE user
                SET email = ?,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = ?"#,
        )
        .bind(&email)
        .bind(id)
        .execute(&self.pool as &SqlitePool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(UserRepositoryError::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_display_name(&self, user_id: i64) -> Result<String, UserRepositoryError> {
        let row = sqlx::query(r#"SELECT name FROM user_names WHERE user_id = ?"#)
            .bind(user_id)
            .fetch_optional(&self.pool as &SqlitePool)
            .await?
            .ok_or(UserRepositoryError::NotFound)?;

        Ok(row.get(0))
    }

    async fn insert_display_name(
        &self,
        user_id: i64,
        name: String,
    ) -> Result<(), UserRepositoryError> {
        sqlx::query(
            r#"INSERT INTO user_names(
                user_id,
                name
            ) VALUES (?, ?)"#,
        )
        .bind(user_id)
        .bind(&name)
        .execute(&self.pool as &SqlitePool)
        .await?;

        Ok(())
    }

    async fn update_display_name(
        &self,
        user_id: i64,
        name: String,
    ) -> Result<u64, UserRepositoryError> {
        let rows_affected = sqlx::query(
            r#"UPDATE user_names
                SET name = ?
                WHERE user_id = ?"#,
        )
        .bind(&name)
        .bind(user_id)
        .execute(&self.pool as &SqlitePool)
        .await?
        .rows_affected();

        Ok(rows_affected)
    }
}
