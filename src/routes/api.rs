// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Extension, Json, Router,
};
use std::sync::Arc;

use crate::error::Result;
use crate::middleware::auth::SessionUser;
use crate::models::{FileSummary, UserProfile};
use crate::routes::auth::logout;
use crate::AppState;

/// Session-protected routes.
/// The session middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/profile", get(get_profile))
        .route("/api/listFiles", get(list_files))
        .route("/api/logout", post(logout))
}

/// Get the signed-in user's profile (straight from the session).
async fn get_profile(Extension(user): Extension<SessionUser>) -> Json<UserProfile> {
    Json(UserProfile {
        id: user.id,
        email: user.email,
        name: user.name,
        photo: user.photo,
    })
}

/// List the user's 10 most recently modified Drive files.
///
/// The authorization resolver supplies a valid access token per the
/// deployed variant; the Drive response is relayed as-is.
async fn list_files(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
) -> Result<Json<Vec<FileSummary>>> {
    let access_token = state.authorizer.resolve(&user, &headers).await?;
    let files = state.drive.list_recent_files(&access_token).await?;
    Ok(Json(files))
}
