use std::cmp::Ordering;

use chrono::Utc;
use itertools::Itertools;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::{
    entities::book::{Book, BookPatch, NewBook},
    repositories::{
        book::{BookRepository, BookRepositoryError},
        cover::{CoverRepository, CoverRepositoryError},
        user::{UserRepository, UserRepositoryError},
    },
};

/// Derived recommendation lists are capped to a dashboard-sized slice.
const LIST_LIMIT: usize = 9;

/// Books below this rating never show up in the highest rated lists.
const RATING_FLOOR: f64 = 4.0;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("book {0} not found")]
    BookNotFound(i64),
    #[error("nothing to update")]
    EmptyPatch,
    #[error("repository error: {0}")]
    RepositoryError(#[from] BookRepositoryError),
    #[error("cover repository error: {0}")]
    CoverError(#[from] CoverRepositoryError),
    #[error("user repository error: {0}")]
    UserError(#[from] UserRepositoryError),
}

/// Per-session cache of one user's library.
///
/// Constructed once per authenticated session and handed to consumers
/// explicitly. Mutations write through to the repositories and reconcile
/// the cache only when the write is confirmed, so a failed write leaves
/// the cached collection exactly as it was. Every operation reports its
/// outcome; the presentation layer decides what to do with a failure.
pub struct LibraryService<B, C, U>
where
    B: BookRepository,
    C: CoverRepository,
    U: UserRepository,
{
    user_id: i64,
    books: RwLock<Vec<Book>>,
    user_name: RwLock<Option<String>>,
    book_repo: B,
    cover_repo: C,
    user_repo: U,
}

impl<B, C, U> LibraryService<B, C, U>
where
    B: BookRepository,
    C: CoverRepository,
    U: UserRepository,
{
    pub fn new(user_id: i64, book_repo: B, cover_repo: C, user_repo: U) -> Self {
        Self {
            user_id,
            books: RwLock::new(vec![]),
            user_name: RwLock::new(None),
            book_repo,
            cover_repo,
            user_repo,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Fetches the user's books and display name in parallel and replaces
    /// the cache. On failure the previous cache is left untouched.
    pub async fn load(&self) -> Result<(), LibraryError> {
        let books_fut = async {
            self.book_repo
                .get_books_by_user_id(self.user_id)
                .await
                .map_err(LibraryError::from)
        };
        let name_fut = async {
            self.user_repo
                .get_display_name(self.user_id)
                .await
                .map_err(LibraryError::from)
        };

        let (books, name) = futures::try_join!(books_fut, name_fut).map_err(|e| {
            error!("failed to fetch user data: {e}");
            e
        })?;

        *self.books.write().await = books;
        *self.user_name.write().await = Some(name);

        Ok(())
    }

    pub async fn user_name(&self) -> Option<String> {
        self.user_name.read().await.clone()
    }

    /// Patches the cached display name after a confirmed account update.
    pub async fn set_user_name(&self, name: &str) {
        *self.user_name.write().await = Some(name.to_string());
    }

    pub async fn all_books(&self) -> Vec<Book> {
        self.books.read().await.clone()
    }

    pub async fn book_by_id(&self, book_id: i64) -> Option<Book> {
        self.books
            .read()
            .await
            .iter()
            .find(|b| b.id == book_id)
            .cloned()
    }

    pub async fn highest_rated(&self) -> Vec<Book> {
        let books = self.books.read().await;
        highest_rated(&books)
    }

    pub async fn highest_rated_for_genre(&self, genre: &str) -> Vec<Book> {
        let books = self.books.read().await;
        highest_rated_for_genre(&books, genre)
    }

    /// Books with neither a start nor a finish date, newest first.
    pub async fn newest_unread(&self) -> Vec<Book> {
        let books = self.books.read().await;
        books
            .iter()
            .filter(|b| b.started_reading_on.is_none() && b.finished_reading_on.is_none())
            .sorted_by(|a, b| b.created_at.cmp(&a.created_at))
            .take(LIST_LIMIT)
            .cloned()
            .collect()
    }

    pub async fn currently_reading(&self) -> Vec<Book> {
        let books = self.books.read().await;
        books
            .iter()
            .filter(|b| b.started_reading_on.is_some() && b.finished_reading_on.is_none())
            .sorted_by(|a, b| b.started_reading_on.cmp(&a.started_reading_on))
            .take(LIST_LIMIT)
            .cloned()
            .collect()
    }

    /// The most common genre across the collection. Each book's genre
    /// field is split on `", "`; ties break in first-seen order.
    pub async fn favorite_genre(&self) -> Option<String> {
        let books = self.books.read().await;
        favorite_genre(&books)
    }

    /// Write-through partial update. The cached copy is only patched when
    /// the repository confirms the write.
    pub async fn update_book(&self, book_id: i64, patch: &BookPatch) -> Result<Book, LibraryError> {
        if patch.is_empty() {
            return Err(LibraryError::EmptyPatch);
        }

        let affected = self
            .book_repo
            .update_book(self.user_id, book_id, patch)
            .await?;
        if affected == 0 {
            return Err(LibraryError::BookNotFound(book_id));
        }

        let mut books = self.books.write().await;
        let book = books
            .iter_mut()
            .find(|b| b.id == book_id)
            .ok_or(LibraryError::BookNotFound(book_id))?;
        patch.apply_to(book);

        Ok(book.clone())
    }

    /// Write-through delete; the book leaves the cache only on confirmed
    /// success, after which it is absent from every derived list.
    pub async fn delete_book(&self, book_id: i64) -> Result<(), LibraryError> {
        let affected = self.book_repo.delete_book(self.user_id, book_id).await?;
        if affected == 0 {
            return Err(LibraryError::BookNotFound(book_id));
        }

        self.books.write().await.retain(|b| b.id != book_id);

        Ok(())
    }

    /// Bulk insert from an external suggestion source, followed by a full
    /// reload so the cache picks up the backend-assigned ids.
    pub async fn add_books(&self, new_books: &[NewBook]) -> Result<(), LibraryError> {
        self.book_repo.insert_books(self.user_id, new_books).await?;
        self.load().await
    }

    /// Stores a cover image under the user's path and patches the book's
    /// cover field. Returns the public path of the stored cover. An
    /// unknown book id is rejected before anything is written.
    pub async fn upload_cover(
        &self,
        book_id: i64,
        filename: &str,
        data: &[u8],
    ) -> Result<String, LibraryError> {
        if self.book_by_id(book_id).await.is_none() {
            return Err(LibraryError::BookNotFound(book_id));
        }

        let stamped = format!("{}_{}", Utc::now().timestamp_millis(), filename);
        let stored = self.cover_repo.put(self.user_id, &stamped, data).await?;
        let cover_image = format!("/book-covers/{}/{}", self.user_id, stored);

        let patch = BookPatch {
            cover_image: Some(cover_image.clone()),
            ..Default::default()
        };
        self.update_book(book_id, &patch).await?;

        Ok(cover_image)
    }
}

fn highest_rated(books: &[Book]) -> Vec<Book> {
    books
        .iter()
        .filter(|b| b.rating.is_some_and(|r| r >= RATING_FLOOR))
        .sorted_by(|a, b| {
            b.rating
                .unwrap_or(0.0)
                .partial_cmp(&a.rating.unwrap_or(0.0))
                .unwrap_or(Ordering::Equal)
        })
        .take(LIST_LIMIT)
        .cloned()
        .collect()
}

fn highest_rated_for_genre(books: &[Book], genre: &str) -> Vec<Book> {
    books
        .iter()
        .filter(|b| b.rating.is_some_and(|r| r >= RATING_FLOOR))
        .filter(|b| b.genre.as_deref().is_some_and(|g| g.contains(genre)))
        .sorted_by(|a, b| {
            b.rating
                .unwrap_or(0.0)
                .partial_cmp(&a.rating.unwrap_or(0.0))
                .unwrap_or(Ordering::Equal)
        })
        .take(LIST_LIMIT)
        .cloned()
        .collect()
}

fn favorite_genre(books: &[Book]) -> Option<String> {
    // first-seen order doubles as the tie-break, so counting stays in a Vec
    let mut counts: Vec<(&str, usize)> = vec![];

    for book in books {
        let Some(genres) = book.genre.as_deref() else {
            continue;
        };
        for genre in genres.split(", ").filter(|g| !g.is_empty()) {
            match counts.iter_mut().find(|(name, _)| *name == genre) {
                Some((_, count)) => *count += 1,
                None => counts.push((genre, 1)),
            }
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (name, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((name, count));
        }
    }

    best.map(|(name, _)| name.to_string())
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicBool, AtomicI64, Ordering},
        Mutex,
    };

    use async_trait::async_trait;
    use chrono::NaiveDateTime;

    use super::*;
    use crate::domain::entities::user::User;

    #[derive(Default)]
    struct FakeBookRepository {
        books: Mutex<Vec<Book>>,
        next_id: AtomicI64,
        fail: AtomicBool,
    }

    impl FakeBookRepository {
        fn with_books(books: Vec<Book>) -> Self {
            let next_id = books.iter().map(|b| b.id).max().unwrap_or(0) + 1;
            Self {
                books: Mutex::new(books),
                next_id: AtomicI64::new(next_id),
                fail: AtomicBool::new(false),
            }
        }

        fn fail_writes(&self) {
            self.fail.store(true, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), BookRepositoryError> {
            if self.fail.load(Ordering::SeqCst) {
                Err(BookRepositoryError::Other(anyhow::anyhow!(
                    "forced failure"
                )))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl BookRepository for &FakeBookRepository {
        async fn get_books_by_user_id(
            &self,
            user_id: i64,
        ) -> Result<Vec<Book>, BookRepositoryError> {
            self.check()?;
            Ok(self
                .books
                .lock()
                .unwrap()
                .iter()
                .filter(|b| b.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn insert_books(
            &self,
            user_id: i64,
            books: &[NewBook],
        ) -> Result<(), BookRepositoryError> {
            self.check()?;
            let mut all = self.books.lock().unwrap();
            for new_book in books {
                all.push(Book {
                    id: self.next_id.fetch_add(1, Ordering::SeqCst),
                    user_id,
                    title: new_book.title.clone(),
                    author: new_book.author.clone(),
                    description: new_book.description.clone(),
                    genre: new_book.genre.clone(),
                    cover_image: new_book.cover_image.clone(),
                    rating: new_book.rating,
                    ..Default::default()
                });
            }
            Ok(())
        }

        async fn update_book(
            &self,
            user_id: i64,
            book_id: i64,
            patch: &BookPatch,
        ) -> Result<u64, BookRepositoryError> {
            self.check()?;
            let mut all = self.books.lock().unwrap();
            match all
                .iter_mut()
                .find(|b| b.id == book_id && b.user_id == user_id)
            {
                Some(book) => {
                    patch.apply_to(book);
                    Ok(1)
                }
                None => Ok(0),
            }
        }

        async fn delete_book(
            &self,
            user_id: i64,
            book_id: i64,
        ) -> Result<u64, BookRepositoryError> {
            self.check()?;
            let mut all = self.books.lock().unwrap();
            let before = all.len();
            all.retain(|b| !(b.id == book_id && b.user_id == user_id));
            Ok((before - all.len()) as u64)
        }
    }

    #[derive(Default)]
    struct FakeCoverRepository {
        stored: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CoverRepository for &FakeCoverRepository {
        async fn put(
            &self,
            _user_id: i64,
            filename: &str,
            _data: &[u8],
        ) -> Result<String, CoverRepositoryError> {
            self.stored.lock().unwrap().push(filename.to_string());
            Ok(filename.to_string())
        }

        async fn get(&self, _user_id: i64, _name: &str) -> Result<Vec<u8>, CoverRepositoryError> {
            Err(CoverRepositoryError::NotFound)
        }
    }

    #[derive(Default)]
    struct FakeUserRepository {
        name: Option<String>,
    }

    #[async_trait]
    impl UserRepository for &FakeUserRepository {
        async fn insert_user(&self, _user: User) -> Result<i64, UserRepositoryError> {
            Ok(1)
        }

        async fn get_user_by_id(&self, _id: i64) -> Result<User, UserRepositoryError> {
            Err(UserRepositoryError::NotFound)
        }

        async fn get_user_by_email(&self, _email: String) -> Result<User, UserRepositoryError> {
            Err(UserRepositoryError::NotFound)
        }

        async fn update_email(&self, _id: i64, _email: String) -> Result<u64, UserRepositoryError> {
            Ok(1)
        }

        async fn get_display_name(&self, _user_id: i64) -> Result<String, UserRepositoryError> {
            self.name.clone().ok_or(UserRepositoryError::NotFound)
        }

        async fn insert_display_name(
            &self,
            _user_id: i64,
            _name: String,
        ) -> Result<(), UserRepositoryError> {
            Ok(())
        }

        async fn update_display_name(
            &self,
            _user_id: i64,
            _name: String,
        ) -> Result<u64, UserRepositoryError> {
            Ok(1)
        }
    }

    fn date(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn book(id: i64, title: &str) -> Book {
        Book {
            id,
            user_id: 1,
            title: title.to_string(),
            created_at: date("2024-01-01 00:00:00"),
            ..Default::default()
        }
    }

    async fn library<'a>(
        books: &'a FakeBookRepository,
        covers: &'a FakeCoverRepository,
        users: &'a FakeUserRepository,
    ) -> LibraryService<&'a FakeBookRepository, &'a FakeCoverRepository, &'a FakeUserRepository>
    {
        let library = LibraryService::new(1, books, covers, users);
        library.load().await.unwrap();
        library
    }

    fn named_user() -> FakeUserRepository {
        FakeUserRepository {
            name: Some("Alice".to_string()),
        }
    }

    #[tokio::test]
    async fn load_populates_books_and_user_name() {
        let books = FakeBookRepository::with_books(vec![book(1, "Dune"), book(2, "Emma")]);
        let covers = FakeCoverRepository::default();
        let users = named_user();

        let library = library(&books, &covers, &users).await;

        assert_eq!(library.all_books().await.len(), 2);
        assert_eq!(library.user_name().await.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn load_failure_keeps_previous_cache() {
        let books = FakeBookRepository::with_books(vec![book(1, "Dune")]);
        let covers = FakeCoverRepository::default();
        let users = named_user();

        let library = library(&books, &covers, &users).await;

        books.fail_writes();
        assert!(library.load().await.is_err());
        assert_eq!(library.all_books().await.len(), 1);
    }

    #[tokio::test]
    async fn highest_rated_caps_at_nine_and_sorts_descending() {
        let mut seed = vec![];
        for id in 1..=12 {
            let mut b = book(id, "rated");
            b.rating = Some(4.0 + (id as f64) / 100.0);
            seed.push(b);
        }
        let mut unrated = book(13, "unrated");
        unrated.rating = None;
        seed.push(unrated);
        let mut low = book(14, "low");
        low.rating = Some(2.0);
        seed.push(low);

        let books = FakeBookRepository::with_books(seed);
        let covers = FakeCoverRepository::default();
        let users = named_user();
        let library = library(&books, &covers, &users).await;

        let rated = library.highest_rated().await;

        assert_eq!(rated.len(), 9);
        assert!(rated.iter().all(|b| b.rating.unwrap() >= 4.0));
        for window in rated.windows(2) {
            assert!(window[0].rating.unwrap() >= window[1].rating.unwrap());
        }
    }

    #[tokio::test]
    async fn highest_rated_for_genre_matches_substring() {
        let mut fantasy = book(1, "fantasy");
        fantasy.rating = Some(5.0);
        fantasy.genre = Some("Fantasy, Drama".to_string());
        let mut crime = book(2, "crime");
        crime.rating = Some(5.0);
        crime.genre = Some("Crime".to_string());
        let mut unrated = book(3, "unrated fantasy");
        unrated.genre = Some("Fantasy".to_string());

        let books = FakeBookRepository::with_books(vec![fantasy, crime, unrated]);
        let covers = FakeCoverRepository::default();
        let users = named_user();
        let library = library(&books, &covers, &users).await;

        let matched = library.highest_rated_for_genre("Fantasy").await;

        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, 1);
    }

    #[tokio::test]
    async fn currently_reading_requires_start_without_finish() {
        let mut reading = book(1, "reading");
        reading.started_reading_on = Some(date("2024-03-01 00:00:00"));
        let mut finished = book(2, "finished");
        finished.started_reading_on = Some(date("2024-01-01 00:00:00"));
        finished.finished_reading_on = Some(date("2024-02-01 00:00:00"));
        let unstarted = book(3, "unstarted");
        let mut older = book(4, "older read");
        older.started_reading_on = Some(date("2024-02-01 00:00:00"));

        let books = FakeBookRepository::with_books(vec![reading, finished, unstarted, older]);
        let covers = FakeCoverRepository::default();
        let users = named_user();
        let library = library(&books, &covers, &users).await;

        let reading = library.currently_reading().await;

        assert_eq!(
            reading.iter().map(|b| b.id).collect::<Vec<_>>(),
            vec![1, 4]
        );
    }

    #[tokio::test]
    async fn newest_unread_sorts_by_creation_time() {
        let mut old = book(1, "old");
        old.created_at = date("2023-01-01 00:00:00");
        let mut new = book(2, "new");
        new.created_at = date("2024-06-01 00:00:00");
        let mut started = book(3, "started");
        started.created_at = date("2024-07-01 00:00:00");
        started.started_reading_on = Some(date("2024-07-02 00:00:00"));

        let books = FakeBookRepository::with_books(vec![old, new, started]);
        let covers = FakeCoverRepository::default();
        let users = named_user();
        let library = library(&books, &covers, &users).await;

        let unread = library.newest_unread().await;

        assert_eq!(unread.iter().map(|b| b.id).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[tokio::test]
    async fn favorite_genre_on_empty_collection_is_none() {
        let books = FakeBookRepository::default();
        let covers = FakeCoverRepository::default();
        let users = named_user();
        let library = library(&books, &covers, &users).await;

        assert_eq!(library.favorite_genre().await, None);
    }

    #[tokio::test]
    async fn favorite_genre_counts_comma_separated_entries() {
        let mut a = book(1, "a");
        a.genre = Some("Fantasy".to_string());
        let mut b = book(2, "b");
        b.genre = Some("Fantasy, Drama".to_string());

        let books = FakeBookRepository::with_books(vec![a, b]);
        let covers = FakeCoverRepository::default();
        let users = named_user();
        let library = library(&books, &covers, &users).await;

        assert_eq!(library.favorite_genre().await.as_deref(), Some("Fantasy"));
    }

    #[tokio::test]
    async fn favorite_genre_tie_breaks_in_first_seen_order() {
        let mut a = book(1, "a");
        a.genre = Some("Drama, Fantasy".to_string());
        let mut b = book(2, "b");
        b.genre = Some("Fantasy, Drama".to_string());

        let books = FakeBookRepository::with_books(vec![a, b]);
        let covers = FakeCoverRepository::default();
        let users = named_user();
        let library = library(&books, &covers, &users).await;

        assert_eq!(library.favorite_genre().await.as_deref(), Some("Drama"));
    }

    #[tokio::test]
    async fn update_book_patches_cache_on_success() {
        let mut seed = book(1, "Dune");
        seed.rating = Some(3.0);
        let books = FakeBookRepository::with_books(vec![seed]);
        let covers = FakeCoverRepository::default();
        let users = named_user();
        let library = library(&books, &covers, &users).await;

        let patch = BookPatch {
            rating: Some(5.0),
            ..Default::default()
        };
        library.update_book(1, &patch).await.unwrap();

        assert_eq!(library.book_by_id(1).await.unwrap().rating, Some(5.0));
    }

    #[tokio::test]
    async fn failed_update_leaves_cache_untouched() {
        let mut seed = book(1, "Dune");
        seed.rating = Some(3.0);
        let books = FakeBookRepository::with_books(vec![seed]);
        let covers = FakeCoverRepository::default();
        let users = named_user();
        let library = library(&books, &covers, &users).await;

        books.fail_writes();
        let patch = BookPatch {
            rating: Some(5.0),
            ..Default::default()
        };
        assert!(library.update_book(1, &patch).await.is_err());

        assert_eq!(library.book_by_id(1).await.unwrap().rating, Some(3.0));
    }

    #[tokio::test]
    async fn empty_patch_is_rejected() {
        let books = FakeBookRepository::with_books(vec![book(1, "Dune")]);
        let covers = FakeCoverRepository::default();
        let users = named_user();
        let library = library(&books, &covers, &users).await;

        let result = library.update_book(1, &BookPatch::default()).await;

        assert!(matches!(result, Err(LibraryError::EmptyPatch)));
    }

    #[tokio::test]
    async fn deleted_book_is_absent_from_derived_queries() {
        let mut seed = book(1, "Dune");
        seed.rating = Some(5.0);
        seed.genre = Some("Sci-Fi".to_string());
        let books = FakeBookRepository::with_books(vec![seed]);
        let covers = FakeCoverRepository::default();
        let users = named_user();
        let library = library(&books, &covers, &users).await;

        library.delete_book(1).await.unwrap();

        assert!(library.book_by_id(1).await.is_none());
        assert!(library.highest_rated().await.is_empty());
        assert!(library.newest_unread().await.is_empty());
        assert_eq!(library.favorite_genre().await, None);
    }

    #[tokio::test]
    async fn failed_delete_keeps_book_in_cache() {
        let books = FakeBookRepository::with_books(vec![book(1, "Dune")]);
        let covers = FakeCoverRepository::default();
        let users = named_user();
        let library = library(&books, &covers, &users).await;

        books.fail_writes();
        assert!(library.delete_book(1).await.is_err());

        assert!(library.book_by_id(1).await.is_some());
    }

    #[tokio::test]
    async fn add_books_reloads_cache_with_assigned_ids() {
        let books = FakeBookRepository::with_books(vec![book(1, "Dune")]);
        let covers = FakeCoverRepository::default();
        let users = named_user();
        let library = library(&books, &covers, &users).await;

        let suggested = vec![
            NewBook {
                title: "Emma".to_string(),
                ..Default::default()
            },
            NewBook {
                title: "Persuasion".to_string(),
                ..Default::default()
            },
        ];
        library.add_books(&suggested).await.unwrap();

        let cached = library.all_books().await;
        assert_eq!(cached.len(), 3);
        assert!(cached.iter().all(|b| b.id > 0));
    }

    #[tokio::test]
    async fn upload_cover_patches_cover_field() {
        let books = FakeBookRepository::with_books(vec![book(1, "Dune")]);
        let covers = FakeCoverRepository::default();
        let users = named_user();
        let library = library(&books, &covers, &users).await;

        let url = library.upload_cover(1, "dune.jpg", b"bytes").await.unwrap();

        assert!(url.starts_with("/book-covers/1/"));
        assert!(url.ends_with("_dune.jpg"));
        assert_eq!(
            library.book_by_id(1).await.unwrap().cover_image,
            Some(url)
        );
    }

    #[tokio::test]
    async fn cover_for_unknown_book_is_never_stored() {
        let books = FakeBookRepository::with_books(vec![book(1, "Dune")]);
        let covers = FakeCoverRepository::default();
        let users = named_user();
        let library = library(&books, &covers, &users).await;

        let result = library.upload_cover(99, "dune.jpg", b"bytes").await;

        assert!(matches!(result, Err(LibraryError::BookNotFound(99))));
        assert!(covers.stored.lock().unwrap().is_empty());
    }
}
