// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-in, CSRF, and authorization-code routes.

use axum::{extract::State, http::StatusCode, Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{
    create_session_token, removal_cookie, session_cookie, SessionUser,
};
use crate::middleware::csrf;
use crate::models::{User, UserProfile};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

/// CSRF token response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CsrfTokenResponse {
    #[serde(rename = "csrfToken")]
    pub csrf_token: String,
}

/// Issue a CSRF token: one copy in the response body for the request
/// header, one tagged copy in the cookie.
pub async fn csrf_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<CsrfTokenResponse>)> {
    let (token, cookie_value) = csrf::generate_token(&state.config.session_signing_key)?;

    let jar = jar.add(csrf::csrf_cookie(cookie_value, state.config.cookie_samesite));

    Ok((jar, Json(CsrfTokenResponse { csrf_token: token })))
}

/// Sign-in request from the front end after the GIS popup completes.
#[derive(Deserialize, Validate)]
pub struct SignInRequest {
    #[serde(rename = "idToken")]
    #[validate(length(min = 1, message = "idToken must not be empty"))]
    pub id_token: String,
}

/// Sign-in response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SignInResponse {
    #[serde(rename = "userInfo")]
    pub user_info: UserProfile,
}

/// Verify the posted ID token, upsert the user, and establish a session.
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<SignInRequest>,
) -> Result<(CookieJar, Json<SignInResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let identity = state.identity.verify_id_token(&payload.id_token).await?;

    let now = format_utc_rfc3339(chrono::Utc::now());
    let user = User {
        id: identity.subject,
        email: identity.email.clone(),
        name: identity.name.unwrap_or(identity.email),
        photo: identity.photo,
        created_at: now.clone(),
        last_login: now,
    };

    if let Err(e) = state.db.upsert_user(&user).await {
        tracing::warn!(error = %e, "Failed to store user profile, continuing anyway");
    }

    let token = create_session_token(&user, &state.config.session_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Session creation failed: {}", e)))?;

    let jar = jar.add(session_cookie(token, state.config.cookie_samesite));

    tracing::info!(user_id = %user.id, "User signed in");

    Ok((
        jar,
        Json(SignInResponse {
            user_info: UserProfile::from(&user),
        }),
    ))
}

/// Authorization-code exchange request.
#[derive(Deserialize, Validate)]
pub struct ExchangeCodeRequest {
    #[validate(length(min = 1, message = "code must not be empty"))]
    pub code: String,
}

/// Exchange an authorization code and persist the credential
/// (code-flow variant only).
pub async fn exchange_code(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<ExchangeCodeRequest>,
) -> Result<StatusCode> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    state.authorizer.exchange_code(&user.id, &payload.code).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Clear the session cookie.
pub async fn logout(
    Extension(user): Extension<SessionUser>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode)> {
    tracing::info!(user_id = %user.id, "User logged out");
    let jar = jar.add(removal_cookie());
    Ok((jar, StatusCode::NO_CONTENT))
}
