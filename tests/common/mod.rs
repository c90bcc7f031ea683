// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use drive_relay::config::Config;
use drive_relay::db::FirestoreDb;
use drive_relay::middleware::auth::{create_session_token, SESSION_COOKIE};
use drive_relay::models::User;
use drive_relay::routes::create_router;
use drive_relay::services::{
    Authorizer, CodeFlowAuthorizer, DriveClient, GoogleIdVerifier, GoogleTokenClient, TokenCipher,
};
use drive_relay::AppState;
use std::sync::Arc;
use tower::ServiceExt;

/// A user as it would exist after a successful sign-in.
#[allow(dead_code)]
pub fn test_user(id: &str) -> User {
    User {
        id: id.to_string(),
        email: format!("user-{}@example.com", id),
        name: "Test User".to_string(),
        photo: None,
        created_at: "2026-01-01T00:00:00Z".to_string(),
        last_login: "2026-01-01T00:00:00Z".to_string(),
    }
}

/// Cookie header value for an established session.
#[allow(dead_code)]
pub fn session_cookie_for(user: &User, signing_key: &[u8]) -> String {
    let token = create_session_token(user, signing_key).expect("session token");
    format!("{}={}", SESSION_COOKIE, token)
}

/// Create a code-flow test app backed by an in-memory store.
///
/// `token_url` / `drive_url` point the upstream clients at local stubs;
/// `identity` substitutes a static-key verifier for sign-in tests.
#[allow(dead_code)]
pub fn create_code_flow_app(
    token_url: Option<String>,
    drive_url: Option<String>,
    identity: Option<GoogleIdVerifier>,
) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = FirestoreDb::new_in_memory();
    let cipher = TokenCipher::new(&config.session_signing_key).expect("token cipher");

    let client_secret = config
        .google_client_secret
        .clone()
        .expect("test config has a client secret");
    let token_client = match token_url {
        Some(url) => {
            GoogleTokenClient::with_token_url(config.google_client_id.clone(), client_secret, url)
        }
        None => GoogleTokenClient::new(config.google_client_id.clone(), client_secret),
    };

    let authorizer = Authorizer::CodeFlow(CodeFlowAuthorizer::new(
        token_client,
        db.clone(),
        cipher,
        Arc::new(dashmap::DashMap::new()),
        Arc::new(dashmap::DashMap::new()),
    ));

    let identity = Arc::new(match identity {
        Some(v) => v,
        None => GoogleIdVerifier::new(&config).expect("verifier"),
    });

    let drive = match drive_url {
        Some(url) => DriveClient::with_base_url(url),
        None => DriveClient::new(),
    };

    let state = Arc::new(AppState {
        config,
        db,
        identity,
        authorizer,
        drive,
    });

    (create_router(state.clone()), state)
}

/// Create an implicit-variant test app (no server-side credential state).
#[allow(dead_code)]
pub fn create_implicit_app(drive_url: Option<String>) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.auth_variant = drive_relay::config::AuthVariant::Implicit;

    let db = FirestoreDb::new_in_memory();
    let identity = Arc::new(GoogleIdVerifier::new(&config).expect("verifier"));

    let drive = match drive_url {
        Some(url) => DriveClient::with_base_url(url),
        None => DriveClient::new(),
    };

    let state = Arc::new(AppState {
        config,
        db,
        identity,
        authorizer: Authorizer::Implicit,
        drive,
    });

    (create_router(state.clone()), state)
}

/// Fetch a CSRF token: returns `(header_token, cookie_header_value)`.
#[allow(dead_code)]
pub async fn obtain_csrf(app: axum::Router) -> (String, String) {
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/csrfToken")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("csrf cookie set")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let token = json["csrfToken"].as_str().expect("token in body").to_string();

    (token, cookie)
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
