// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookie middleware.
//!
//! The session is a signed JWT carried in an HttpOnly cookie; the claims
//! embed the signed-in user's profile so `/api/profile` needs no storage
//! round trip.

use crate::config::CookieSameSite;
use crate::error::AppError;
use crate::models::User;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "app_session";

/// Session lifetime (30 days).
const SESSION_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Session JWT claims.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Subject (Google user id)
    pub sub: String,
    /// Email address
    pub email: String,
    /// Display name
    pub name: String,
    /// Profile photo URL
    pub picture: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated user extracted from the session cookie.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub photo: Option<String>,
}

/// Middleware that requires a valid session cookie.
///
/// A missing, invalid, or expired cookie yields "no user", which the API
/// surface reports as an authorization failure rather than a crash.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(AppError::Unauthorized)?;

    let key = DecodingKey::from_secret(&state.config.session_signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<SessionClaims>(&token, &key, &validation)
        .map_err(|_| AppError::Unauthorized)?;

    let claims = token_data.claims;

    // A session without a subject must never be trusted.
    if claims.sub.is_empty() {
        return Err(AppError::Unauthorized);
    }

    let session_user = SessionUser {
        id: claims.sub,
        email: claims.email,
        name: claims.name,
        photo: claims.picture,
    };
    request.extensions_mut().insert(session_user);

    Ok(next.run(request).await)
}

/// Create a session JWT for a signed-in user.
pub fn create_session_token(user: &User, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = SessionClaims {
        sub: user.id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        picture: user.photo.clone(),
        iat: now,
        exp: now + SESSION_TTL_SECS as usize,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// Build the session cookie holding a freshly minted token.
pub fn session_cookie(token: String, samesite: CookieSameSite) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(to_same_site(samesite))
        .max_age(time::Duration::seconds(SESSION_TTL_SECS))
        .build()
}

/// Build an expired session cookie for logout.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::ZERO)
        .build()
}

pub(crate) fn to_same_site(samesite: CookieSameSite) -> SameSite {
    match samesite {
        CookieSameSite::Lax => SameSite::Lax,
        CookieSameSite::Strict => SameSite::Strict,
        CookieSameSite::None => SameSite::None,
    }
}
