use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use super::authorize;
use crate::{
    domain::services::user::UserError,
    infrastructure::config::Config,
    presentation::{token::Token, Registry, UserSvc},
};

#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub email: String,
    #[serde(rename = "userName")]
    pub user_name: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateAccountResponse {
    pub success: bool,
}

/// `PATCH /api/update-account` — updates email and display name; the
/// session's cached name is patched only after the write succeeds.
pub async fn update_account(
    token: Token,
    Extension(config): Extension<Config>,
    Extension(user_svc): Extension<UserSvc>,
    Extension(registry): Extension<Arc<Registry>>,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<Json<UpdateAccountResponse>, StatusCode> {
    let claims = authorize(&config.secret, &token)?;

    user_svc
        .update_account(claims.sub, &request.email, &request.user_name)
        .await
        .map_err(|e| {
            error!("failed to update account for user {}: {e}", claims.sub);
            match e {
                UserError::UserNotFound => StatusCode::NOT_FOUND,
                UserError::EmailTaken => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        })?;

    if let Some(library) = registry.get(claims.sub).await {
        library.set_user_name(&request.user_name).await;
    }

    Ok(Json(UpdateAccountResponse { success: true }))
}
