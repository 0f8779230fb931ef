// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

/// Bearer token payload. Tokens come from the platform's identity provider;
/// this service only checks them.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Student id. Sessions are owned by this value.
    pub sub: String,
    pub role: String,
    /// Unix seconds.
    pub exp: usize,
}

/// Signs a token for `subject`. Tokens are normally minted by the auth
/// service sharing `JWT_SECRET`; this is its counterpart for tooling and tests.
pub fn sign_jwt(subject: &str, role: &str, secret: &str, ttl_secs: u64) -> Result<String, AppError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let claims = Claims {
        sub: subject.to_owned(),
        role: role.to_owned(),
        exp: (now.as_secs() + ttl_secs) as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// HS256 check against the shared secret. Expired or foreign tokens are an
/// `AuthError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| AppError::AuthError("Invalid token".to_string()))
}

/// Guards the session routes: a missing or bad bearer token is a bare 401,
/// a good one leaves its `Claims` in the request extensions.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| verify_jwt(token, &config.jwt_secret).ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
