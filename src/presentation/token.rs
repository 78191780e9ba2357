use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts, HeaderMap},
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};

pub const SESSION_COOKIE: &str = "token";

/// Bearer token from the `Authorization` header, falling back to the
/// session cookie set by the form endpoints. Empty when neither is
/// present; handlers decide whether that is an error.
pub struct Token(pub String);

impl<S> FromRequestParts<S> for Token
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string())
            .ok()
            .or_else(|| cookie_token(&parts.headers))
            .unwrap_or_default();

        Ok(Token(token))
    }
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split("; "))
        .find_map(|pair| {
            pair.strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .map(|token| token.to_string())
}
