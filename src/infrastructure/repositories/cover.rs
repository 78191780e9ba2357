use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::repositories::cover::{CoverRepository, CoverRepositoryError};

/// Filesystem-backed cover storage, one directory per user.
#[derive(Clone)]
pub struct CoverRepositoryImpl {
    root: PathBuf,
}

impl CoverRepositoryImpl {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

/// Strips anything that could escape the per-user directory.
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl CoverRepository for CoverRepositoryImpl {
    async fn put(
        &self,
        user_id: i64,
        filename: &str,
        data: &[u8],
    ) -> Result<String, CoverRepositoryError> {
        let name = sanitize_filename(filename);
        let dir = self.root.join(user_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&name), data).await?;

        Ok(name)
    }

    async fn get(&self, user_id: i64, name: &str) -> Result<Vec<u8>, CoverRepositoryError> {
        let path = self
            .root
            .join(user_id.to_string())
            .join(sanitize_filename(name));

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CoverRepositoryError::NotFound)
            }
            Err(e) => Err(e.into()),
        }
    }
}
