use axum::{
    body::Body,
    extract::{Extension, Path},
    http::{Response, StatusCode},
    response::IntoResponse,
};

use crate::{
    domain::repositories::cover::{CoverRepository, CoverRepositoryError},
    infrastructure::repositories::cover::CoverRepositoryImpl,
};

/// `GET /book-covers/{user_id}/{file}` — serves a stored cover image.
pub async fn fetch_cover(
    Path((user_id, file)): Path<(i64, String)>,
    Extension(covers): Extension<CoverRepositoryImpl>,
) -> Result<impl IntoResponse, StatusCode> {
    let data = covers.get(user_id, &file).await.map_err(|e| match e {
        CoverRepositoryError::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    })?;

    let content_type = mime_guess::from_path(&file).first_or_octet_stream();

    Response::builder()
        .header("Content-Type", content_type.as_ref())
        .header("Content-Length", data.len())
        .header("Cache-Control", "max-age=864000")
        .body(Body::from(data))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
