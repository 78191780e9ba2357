use std::{ops::Deref, time::Duration};

use sqlx::{
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
};

/// Shared SQLite handle, cloned into each repository.
#[derive(Clone)]
pub struct Pool(SqlitePool);

impl From<SqlitePool> for Pool {
    fn from(pool: SqlitePool) -> Self {
        Self(pool)
    }
}

impl Deref for Pool {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub async fn establish_connection(
    database_path: &str,
    create: bool,
) -> Result<Pool, anyhow::Error> {
    // SQLite leaves foreign keys off per connection; books.user_id and
    // user_names.user_id rely on them.
    let opts = SqliteConnectOptions::new()
        .filename(database_path)
        .create_if_missing(create)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    // Every session container loads books and the display name in
    // parallel, plus cover traffic on top.
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .idle_timeout(Duration::from_secs(5 * 60))
        .connect_with(opts)
        .await?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        match e {
            MigrateError::VersionMismatch(version) => {
                warn!("migration {version} was previously applied but has been modified")
            }
            _ => return Err(e.into()),
        }
    }

    Ok(Pool(pool))
}
