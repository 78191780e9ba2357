use axum::{
    extract::{Extension, Form, Query},
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use fancy_regex::Regex;
use serde::{Deserialize, Serialize};

use super::super::{
    clear_session_cookie, session_cookie, token::Token, Registry, UserSvc, DASHBOARD_ROUTE,
    LOGIN_ROUTE,
};
use crate::{
    domain::services::user::UserError,
    infrastructure::{
        auth::{decode_auth_code, decode_session, encode_auth_code, encode_session, Claims},
        config::Config,
    },
};
use std::sync::Arc;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "passwordConfirmation")]
    pub password_confirmation: String,
}

/// Failure payload echoing the submitted fields, as the form layer
/// expects to re-render them.
#[derive(Debug, Serialize)]
pub struct LoginPayload {
    pub success: bool,
    pub errors: Vec<String>,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterPayload {
    pub success: bool,
    pub errors: Vec<String>,
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "passwordConfirmation")]
    pub password_confirmation: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
}

fn is_valid_email(email: &str) -> bool {
    Regex::new(EMAIL_PATTERN)
        .map(|re| re.is_match(email).unwrap_or(false))
        .unwrap_or(false)
}

/// Every violated rule is collected, not just the first one.
fn validate_login(email: &str, password: &str) -> Vec<String> {
    let mut errors = vec![];

    if email.is_empty() {
        errors.push("Email is required.".to_string());
    } else if !is_valid_email(email) {
        errors.push("Email is not valid.".to_string());
    }

    if password.is_empty() {
        errors.push("Password is required.".to_string());
    } else if password.len() < 8 {
        errors.push("Password must be at least 8 characters long.".to_string());
    }

    errors
}

fn validate_register(form: &RegisterForm) -> Vec<String> {
    let mut errors = vec![];

    if form.username.is_empty() {
        errors.push("Username is required.".to_string());
    } else if form.username.len() < 3 {
        errors.push("Username must be at least 3 characters long.".to_string());
    }

    errors.extend(validate_login(&form.email, &form.password));

    if form.password_confirmation.is_empty() {
        errors.push("Password confirmation is required.".to_string());
    }
    if form.password != form.password_confirmation {
        errors.push("Passwords do not match.".to_string());
    }

    errors
}

pub async fn login(
    Extension(config): Extension<Config>,
    Extension(user_svc): Extension<UserSvc>,
    Form(form): Form<LoginForm>,
) -> Response {
    let mut errors = validate_login(&form.email, &form.password);

    if errors.is_empty() {
        match user_svc.verify_password(&form.email, &form.password).await {
            Ok(user) => {
                match encode_session(&config.secret, user.id, &user.email, config.token_expiry_days)
                {
                    Ok(token) => {
                        return (
                            [(SET_COOKIE, session_cookie(&token))],
                            Redirect::to(DASHBOARD_ROUTE),
                        )
                            .into_response();
                    }
                    Err(e) => {
                        error!("failed to create session: {e}");
                        errors.push("An error occurred while trying to login.".to_string());
                    }
                }
            }
            Err(UserError::UserNotFound) | Err(UserError::WrongPassword) => {
                errors.push("Invalid login credentials.".to_string());
            }
            Err(e) => {
                error!("login failed: {e}");
                errors.push("An error occurred while trying to login.".to_string());
            }
        }
    }

    (
        StatusCode::BAD_REQUEST,
        Json(LoginPayload {
            success: false,
            errors,
            email: form.email,
            password: form.password,
        }),
    )
        .into_response()
}

/// On success the browser is bounced through the auth callback with a
/// one-time code, which mints the session cookie and provisions the
/// display-name row.
pub async fn register(
    Extension(config): Extension<Config>,
    Extension(user_svc): Extension<UserSvc>,
    Form(form): Form<RegisterForm>,
) -> Response {
    let mut errors = validate_register(&form);

    if errors.is_empty() {
        match user_svc.create_user(&form.email, &form.password).await {
            Ok(user_id) => {
                // Fire-and-forget like the rest of registration: a missing
                // name row is repaired by the callback.
                if let Err(e) = user_svc.set_display_name(user_id, &form.username).await {
                    error!("failed to store display name: {e}");
                }

                match encode_auth_code(&config.secret, user_id, &form.email) {
                    Ok(code) => {
                        return Redirect::to(&format!("/auth/callback?code={code}"))
                            .into_response();
                    }
                    Err(e) => {
                        error!("failed to create auth code: {e}");
                        errors.push("An error occurred while trying to register.".to_string());
                    }
                }
            }
            Err(UserError::EmailTaken) => {
                errors.push("User already registered".to_string());
            }
            Err(e) => {
                error!("registration failed: {e}");
                errors.push("An error occurred while trying to register.".to_string());
            }
        }
    }

    (
        StatusCode::BAD_REQUEST,
        Json(RegisterPayload {
            success: false,
            errors,
            username: form.username,
            email: form.email,
            password: form.password,
            password_confirmation: form.password_confirmation,
        }),
    )
        .into_response()
}

/// A one-time code wins over an existing session; an invalid or absent
/// code falls back to the bearer/cookie token.
fn resolve_callback_claims(secret: &str, code: Option<&str>, token: &str) -> Option<Claims> {
    if let Some(code) = code {
        match decode_auth_code(secret, code) {
            Ok(claims) => return Some(claims),
            Err(e) => warn!("auth code exchange failed: {e}"),
        }
    }

    decode_session(secret, token).ok()
}

/// Completes the code exchange: a valid one-time code (or an existing
/// session) becomes a session cookie, and a missing display-name row is
/// provisioned from the registration metadata.
pub async fn callback(
    Query(params): Query<CallbackParams>,
    token: Token,
    Extension(config): Extension<Config>,
    Extension(user_svc): Extension<UserSvc>,
) -> Response {
    let Some(claims) = resolve_callback_claims(&config.secret, params.code.as_deref(), &token.0)
    else {
        return (StatusCode::BAD_REQUEST, "Session data not found.").into_response();
    };

    match user_svc.display_name(claims.sub).await {
        Ok(_) => {}
        Err(UserError::NameNotFound) => {
            let fallback = claims.email.split('@').next().unwrap_or(&claims.email);
            if let Err(e) = user_svc.set_display_name(claims.sub, fallback).await {
                error!("failed to insert user name row: {e}");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to insert new user",
                )
                    .into_response();
            }
        }
        Err(e) => {
            error!("failed to look up user name row: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to check for existing user",
            )
                .into_response();
        }
    }

    match encode_session(&config.secret, claims.sub, &claims.email, config.token_expiry_days) {
        Ok(token) => (
            [(SET_COOKIE, session_cookie(&token))],
            Redirect::to(DASHBOARD_ROUTE),
        )
            .into_response(),
        Err(e) => {
            error!("failed to create session: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session").into_response()
        }
    }
}

/// Drops the session container and clears the cookie; redirects to the
/// login surface whether or not the token was still valid.
pub async fn logout(
    token: Token,
    Extension(config): Extension<Config>,
    Extension(registry): Extension<Arc<Registry>>,
) -> Response {
    if let Ok(claims) = decode_session(&config.secret, &token.0) {
        registry.detach(claims.sub).await;
    }

    (
        [(SET_COOKIE, clear_session_cookie())],
        Redirect::to(LOGIN_ROUTE),
    )
        .into_response()
}
