use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    /// Comma-separated free text, e.g. `"Fantasy, Drama"`.
    pub genre: Option<String>,
    pub cover_image: Option<String>,
    pub rating: Option<f64>,
    pub started_reading_on: Option<NaiveDateTime>,
    pub finished_reading_on: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl Default for Book {
    fn default() -> Self {
        Self {
            id: 0,
            user_id: 0,
            title: "".to_string(),
            author: None,
            description: None,
            genre: None,
            cover_image: None,
            rating: None,
            started_reading_on: None,
            finished_reading_on: None,
            created_at: NaiveDateTime::default(),
        }
    }
}

/// Partial update of the editable fields of a book. `None` leaves the
/// column untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub cover_image: Option<String>,
    pub rating: Option<f64>,
    pub started_reading_on: Option<NaiveDateTime>,
    pub finished_reading_on: Option<NaiveDateTime>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.description.is_none()
            && self.genre.is_none()
            && self.cover_image.is_none()
            && self.rating.is_none()
            && self.started_reading_on.is_none()
            && self.finished_reading_on.is_none()
    }

    pub fn apply_to(&self, book: &mut Book) {
        if let Some(title) = &self.title {
            book.title = title.clone();
        }
        if let Some(author) = &self.author {
            book.author = Some(author.clone());
        }
        if let Some(description) = &self.description {
            book.description = Some(description.clone());
        }
        if let Some(genre) = &self.genre {
            book.genre = Some(genre.clone());
        }
        if let Some(cover_image) = &self.cover_image {
            book.cover_image = Some(cover_image.clone());
        }
        if let Some(rating) = self.rating {
            book.rating = Some(rating);
        }
        if let Some(started) = self.started_reading_on {
            book.started_reading_on = Some(started);
        }
        if let Some(finished) = self.finished_reading_on {
            book.finished_reading_on = Some(finished);
        }
    }
}

/// A book to be inserted, as delivered by an external suggestion source
/// or manual entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub cover_image: Option<String>,
    pub rating: Option<f64>,
}
