use anyhow::{anyhow, Result};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// One-time auth codes are only good for finishing the login flow.
const CODE_PURPOSE: &str = "callback";

/// How long an auth code stays exchangeable, in minutes.
const CODE_EXPIRY_MINUTES: i64 = 10;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    pub exp: usize,
}

pub fn encode_session(
    secret: &str,
    user_id: i64,
    email: &str,
    expiry_days: i64,
) -> Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        purpose: None,
        exp: (chrono::Utc::now() + chrono::Duration::days(expiry_days)).timestamp() as usize,
    };

    encode(secret, &claims)
}

pub fn decode_session(secret: &str, token: &str) -> Result<Claims> {
    let claims = decode(secret, token)?;
    if claims.purpose.is_some() {
        return Err(anyhow!("not a session token"));
    }

    Ok(claims)
}

/// A short-lived single-purpose token standing in for the authorization
/// code the callback endpoint exchanges for a session.
pub fn encode_auth_code(secret: &str, user_id: i64, email: &str) -> Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        purpose: Some(CODE_PURPOSE.to_string()),
        exp: (chrono::Utc::now() + chrono::Duration::minutes(CODE_EXPIRY_MINUTES)).timestamp()
            as usize,
    };

    encode(secret, &claims)
}

pub fn decode_auth_code(secret: &str, code: &str) -> Result<Claims> {
    let claims = decode(secret, code)?;
    if claims.purpose.as_deref() != Some(CODE_PURPOSE) {
        return Err(anyhow!("not an auth code"));
    }

    Ok(claims)
}

fn encode(secret: &str, claims: &Claims) -> Result<String> {
    Ok(jsonwebtoken::encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

fn decode(secret: &str, token: &str) -> Result<Claims> {
    Ok(jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?
    .claims)
}
