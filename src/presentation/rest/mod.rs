pub mod account;
pub mod auth;
pub mod books;
pub mod covers;

use axum::http::StatusCode;

use super::token::Token;
use crate::infrastructure::auth::{decode_session, Claims};

/// Resolves the caller's session claims or rejects with 401.
pub(crate) fn authorize(secret: &str, token: &Token) -> Result<Claims, StatusCode> {
    decode_session(secret, &token.0).map_err(|_| StatusCode::UNAUTHORIZED)
}

pub async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::infrastructure::auth::encode_session;

    #[tokio::test]
    async fn health_reports_ok() {
        assert_eq!(health_check().await, "OK");
    }

    #[test]
    fn authorize_rejects_a_bad_token_with_401() {
        assert_eq!(
            authorize("secret", &Token("garbage".to_string())).err(),
            Some(StatusCode::UNAUTHORIZED)
        );

        let token = encode_session("secret", 7, "reader@example.com", 1).unwrap();
        assert!(authorize("secret", &Token(token)).is_ok());
    }
}
