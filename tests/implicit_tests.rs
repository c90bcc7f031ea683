// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Implicit-variant tests: the browser owns the access token and supplies
//! it with each proxy request; the server holds no credential state.

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use drive_relay::time_utils::format_utc_rfc3339;

mod common;

struct FakeDrive {
    base_url: String,
    hits: Arc<AtomicUsize>,
    last_bearer: Arc<Mutex<Option<String>>>,
}

async fn spawn_fake_drive() -> FakeDrive {
    let hits = Arc::new(AtomicUsize::new(0));
    let last_bearer: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    let h = hits.clone();
    let lb = last_bearer.clone();
    let handler = move |headers: HeaderMap| {
        let h = h.clone();
        let lb = lb.clone();
        async move {
            h.fetch_add(1, Ordering::SeqCst);
            *lb.lock().unwrap() = headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_string);

            Json(serde_json::json!({
                "files": [{"id": "3", "name": "photo.jpg", "mimeType": "image/jpeg"}]
            }))
        }
    };

    let app = Router::new().route("/files", get(handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeDrive {
        base_url: format!("http://{}", addr),
        hits,
        last_bearer,
    }
}

#[tokio::test]
async fn test_client_token_forwarded_to_drive() {
    let fake = spawn_fake_drive().await;
    let (app, state) = common::create_implicit_app(Some(fake.base_url.clone()));

    let user = common::test_user("12345");
    let session = common::session_cookie_for(&user, &state.config.session_signing_key);
    let expiry = format_utc_rfc3339(Utc::now() + Duration::hours(1));

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/listFiles")
                .header(header::COOKIE, session)
                .header(header::AUTHORIZATION, "Bearer ya29.client-held")
                .header("x-token-expiry", expiry)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let files = common::body_json(response).await;
    assert_eq!(files[0]["name"], "photo.jpg");

    assert_eq!(fake.hits.load(Ordering::SeqCst), 1);
    assert_eq!(
        fake.last_bearer.lock().unwrap().as_deref(),
        Some("ya29.client-held")
    );
}

#[tokio::test]
async fn test_missing_client_token_rejected() {
    let fake = spawn_fake_drive().await;
    let (app, state) = common::create_implicit_app(Some(fake.base_url.clone()));

    let user = common::test_user("12345");
    let session = common::session_cookie_for(&user, &state.config.session_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/listFiles")
                .header(header::COOKIE, session)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // The front end must re-run the consent popup
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "authorization_required");
    assert_eq!(fake.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_expired_client_token_rejected() {
    let fake = spawn_fake_drive().await;
    let (app, state) = common::create_implicit_app(Some(fake.base_url.clone()));

    let user = common::test_user("12345");
    let session = common::session_cookie_for(&user, &state.config.session_signing_key);
    let expiry = format_utc_rfc3339(Utc::now() - Duration::minutes(1));

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/listFiles")
                .header(header::COOKIE, session)
                .header(header::AUTHORIZATION, "Bearer ya29.stale")
                .header("x-token-expiry", expiry)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(fake.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_session_still_required_with_client_token() {
    let fake = spawn_fake_drive().await;
    let (app, _) = common::create_implicit_app(Some(fake.base_url.clone()));

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/listFiles")
                .header(header::AUTHORIZATION, "Bearer ya29.client-held")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // A bearer token is no substitute for a session
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(fake.hits.load(Ordering::SeqCst), 0);
}
