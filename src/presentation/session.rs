use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::domain::{
    repositories::{book::BookRepository, cover::CoverRepository, user::UserRepository},
    services::library::LibraryService,
};

/// One library container per authenticated session, keyed by user id.
///
/// The container is created lazily on the first authenticated request,
/// eagerly loads its cache, and is dropped again at logout. Handlers
/// receive the registry by explicit extension rather than any ambient
/// lookup.
pub struct SessionRegistry<B, C, U>
where
    B: BookRepository + Clone,
    C: CoverRepository + Clone,
    U: UserRepository + Clone,
{
    sessions: RwLock<HashMap<i64, Arc<LibraryService<B, C, U>>>>,
    book_repo: B,
    cover_repo: C,
    user_repo: U,
}

impl<B, C, U> SessionRegistry<B, C, U>
where
    B: BookRepository + Clone,
    C: CoverRepository + Clone,
    U: UserRepository + Clone,
{
    pub fn new(book_repo: B, cover_repo: C, user_repo: U) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            book_repo,
            cover_repo,
            user_repo,
        }
    }

    /// The caller's library container, created and loaded on first use.
    /// A failed initial load keeps the container with an empty cache; the
    /// next `load` call can still recover it.
    pub async fn attach(&self, user_id: i64) -> Arc<LibraryService<B, C, U>> {
        if let Some(library) = self.sessions.read().await.get(&user_id) {
            return library.clone();
        }

        let mut sessions = self.sessions.write().await;
        if let Some(library) = sessions.get(&user_id) {
            return library.clone();
        }

        let library = Arc::new(LibraryService::new(
            user_id,
            self.book_repo.clone(),
            self.cover_repo.clone(),
            self.user_repo.clone(),
        ));
        if let Err(e) = library.load().await {
            warn!("initial library load failed for user {user_id}: {e}");
        }
        sessions.insert(user_id, library.clone());

        library
    }

    pub async fn get(&self, user_id: i64) -> Option<Arc<LibraryService<B, C, U>>> {
        self.sessions.read().await.get(&user_id).cloned()
    }

    pub async fn detach(&self, user_id: i64) {
        self.sessions.write().await.remove(&user_id);
    }
}
