// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Double-submit CSRF protection.
//!
//! `GET /api/csrfToken` hands the front end a random token and sets a
//! cookie holding the same token plus an HMAC tag. Mutating endpoints must
//! echo the token in the `X-CSRF-Token` header; the middleware checks the
//! tag and compares header against cookie in constant time before any
//! handler runs.

use crate::config::CookieSameSite;
use crate::error::AppError;
use crate::middleware::auth::to_same_site;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Name of the CSRF cookie.
pub const CSRF_COOKIE: &str = "csrf_token";

/// Request header carrying the double-submitted token.
pub const CSRF_HEADER: &str = "x-csrf-token";

const TOKEN_BYTES: usize = 32;

/// Generate a fresh CSRF token.
///
/// Returns `(token, cookie_value)` where the cookie value is
/// `"{token}.{hmac_tag}"`.
pub fn generate_token(key: &[u8]) -> Result<(String, String), AppError> {
    let mut raw = [0u8; TOKEN_BYTES];
    SystemRandom::new()
        .fill(&mut raw)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("CSRF token generation failed")))?;

    let token = hex::encode(raw);
    let tag = sign_token(key, &token)?;

    let cookie_value = format!("{}.{}", token, tag);
    Ok((token, cookie_value))
}

/// Verify a header token against the cookie value.
///
/// Both the HMAC tag and the header/cookie comparison are constant time.
pub fn verify_pair(key: &[u8], cookie_value: &str, header_token: &str) -> bool {
    let Some((token, tag)) = cookie_value.split_once('.') else {
        return false;
    };

    let Ok(expected_tag) = sign_token(key, token) else {
        return false;
    };

    let tag_ok: bool = tag.as_bytes().ct_eq(expected_tag.as_bytes()).into();
    let token_ok: bool = token.as_bytes().ct_eq(header_token.as_bytes()).into();

    tag_ok && token_ok
}

/// Build the CSRF cookie.
pub fn csrf_cookie(cookie_value: String, samesite: CookieSameSite) -> Cookie<'static> {
    Cookie::build((CSRF_COOKIE, cookie_value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(to_same_site(samesite))
        .build()
}

/// Middleware rejecting mutating requests without a matching token pair.
pub async fn require_csrf(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let cookie_value = jar
        .get(CSRF_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(AppError::CsrfMismatch)?;

    let header_token = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::CsrfMismatch)?;

    if !verify_pair(&state.config.session_signing_key, &cookie_value, header_token) {
        tracing::warn!("CSRF token mismatch");
        return Err(AppError::CsrfMismatch);
    }

    Ok(next.run(request).await)
}

fn sign_token(key: &[u8], token: &str) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(token.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
