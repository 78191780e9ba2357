use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::authorize;
use crate::{
    domain::{
        entities::book::{Book, BookPatch, NewBook},
        services::library::LibraryError,
    },
    infrastructure::config::Config,
    presentation::{token::Token, Registry},
};

/// Everything the dashboard needs in one payload: the cached collection
/// plus each derived list.
#[derive(Debug, Serialize)]
pub struct LibraryPayload {
    pub user_name: Option<String>,
    pub books: Vec<Book>,
    pub highest_rated: Vec<Book>,
    pub currently_reading: Vec<Book>,
    pub newest_unread: Vec<Book>,
    pub favorite_genre: Option<String>,
    pub favorite_genre_books: Vec<Book>,
}

fn status_for(e: &LibraryError) -> StatusCode {
    match e {
        LibraryError::BookNotFound(_) => StatusCode::NOT_FOUND,
        LibraryError::EmptyPatch => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn get_library(
    token: Token,
    Extension(config): Extension<Config>,
    Extension(registry): Extension<Arc<Registry>>,
) -> Result<Json<LibraryPayload>, StatusCode> {
    let claims = authorize(&config.secret, &token)?;
    let library = registry.attach(claims.sub).await;

    let favorite_genre = library.favorite_genre().await;
    let favorite_genre_books = match favorite_genre.as_deref() {
        Some(genre) => library.highest_rated_for_genre(genre).await,
        None => vec![],
    };

    Ok(Json(LibraryPayload {
        user_name: library.user_name().await,
        books: library.all_books().await,
        highest_rated: library.highest_rated().await,
        currently_reading: library.currently_reading().await,
        newest_unread: library.newest_unread().await,
        favorite_genre,
        favorite_genre_books,
    }))
}

pub async fn get_book(
    Path(book_id): Path<i64>,
    token: Token,
    Extension(config): Extension<Config>,
    Extension(registry): Extension<Arc<Registry>>,
) -> Result<Json<Book>, StatusCode> {
    let claims = authorize(&config.secret, &token)?;
    let library = registry.attach(claims.sub).await;

    library
        .book_by_id(book_id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn update_book(
    Path(book_id): Path<i64>,
    token: Token,
    Extension(config): Extension<Config>,
    Extension(registry): Extension<Arc<Registry>>,
    Json(patch): Json<BookPatch>,
) -> Result<Json<Book>, StatusCode> {
    let claims = authorize(&config.secret, &token)?;
    let library = registry.attach(claims.sub).await;

    let book = library.update_book(book_id, &patch).await.map_err(|e| {
        error!("failed to update book {book_id}: {e}");
        status_for(&e)
    })?;

    Ok(Json(book))
}

pub async fn delete_book(
    Path(book_id): Path<i64>,
    token: Token,
    Extension(config): Extension<Config>,
    Extension(registry): Extension<Arc<Registry>>,
) -> Result<impl IntoResponse, StatusCode> {
    let claims = authorize(&config.secret, &token)?;
    let library = registry.attach(claims.sub).await;

    library.delete_book(book_id).await.map_err(|e| {
        error!("failed to delete book {book_id}: {e}");
        status_for(&e)
    })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Bulk insert from a suggestion source; the cache is fully reloaded so
/// the response reflects backend-assigned ids.
pub async fn add_books(
    token: Token,
    Extension(config): Extension<Config>,
    Extension(registry): Extension<Arc<Registry>>,
    Json(new_books): Json<Vec<NewBook>>,
) -> Result<impl IntoResponse, StatusCode> {
    let claims = authorize(&config.secret, &token)?;
    let library = registry.attach(claims.sub).await;

    library.add_books(&new_books).await.map_err(|e| {
        error!("failed to add books: {e}");
        status_for(&e)
    })?;

    Ok((StatusCode::CREATED, Json(library.all_books().await)))
}

#[derive(Debug, Deserialize)]
pub struct CoverParams {
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct CoverPayload {
    pub cover_image: String,
}

pub async fn upload_cover(
    Path(book_id): Path<i64>,
    Query(params): Query<CoverParams>,
    token: Token,
    Extension(config): Extension<Config>,
    Extension(registry): Extension<Arc<Registry>>,
    body: Bytes,
) -> Result<Json<CoverPayload>, StatusCode> {
    let claims = authorize(&config.secret, &token)?;
    let library = registry.attach(claims.sub).await;

    let cover_image = library
        .upload_cover(book_id, &params.filename, &body)
        .await
        .map_err(|e| {
            error!("failed to upload cover for book {book_id}: {e}");
            status_for(&e)
        })?;

    Ok(Json(CoverPayload { cover_image }))
}
