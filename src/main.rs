// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Drive-Relay API Server
//!
//! Backend for the Google sign-in / Drive demo apps. Serves one of three
//! OAuth integration variants (implicit, code-flow, delegation) selected
//! by configuration at startup.

use drive_relay::{
    config::{AuthVariant, Config},
    db::FirestoreDb,
    services::{
        Authorizer, CodeFlowAuthorizer, DelegationAuthorizer, DriveClient, GoogleIdVerifier,
        GoogleTokenClient, TokenCipher,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        port = config.port,
        variant = config.auth_variant.as_str(),
        "Starting Drive-Relay API"
    );

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // ID-token verifier for sign-in
    let identity =
        Arc::new(GoogleIdVerifier::new(&config).expect("Failed to initialize ID-token verifier"));

    // Build the authorization resolver for the configured variant
    let authorizer = match config.auth_variant {
        AuthVariant::Implicit => {
            tracing::info!("Implicit variant: tokens stay client-side");
            Authorizer::Implicit
        }
        AuthVariant::CodeFlow => {
            let client_secret = config
                .google_client_secret
                .clone()
                .expect("GOOGLE_CLIENT_SECRET required for code-flow");

            let cipher = TokenCipher::new(&config.session_signing_key)
                .expect("Failed to initialize token cipher");

            // Shared token cache and refresh locks across all requests
            // within this server instance
            let token_cache = Arc::new(dashmap::DashMap::new());
            let refresh_locks = Arc::new(dashmap::DashMap::new());
            tracing::info!("Token cache initialized");

            Authorizer::CodeFlow(CodeFlowAuthorizer::new(
                GoogleTokenClient::new(config.google_client_id.clone(), client_secret),
                db.clone(),
                cipher,
                token_cache,
                refresh_locks,
            ))
        }
        AuthVariant::Delegation => {
            let key = config
                .service_account
                .clone()
                .expect("GOOGLE_SERVICE_ACCOUNT_KEY required for delegation");
            tracing::info!(
                service_account = %key.client_email,
                "Domain-wide delegation enabled"
            );
            Authorizer::Delegation(
                DelegationAuthorizer::new(key)
                    .expect("Failed to initialize delegation authorizer"),
            )
        }
    };

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        identity,
        authorizer,
        drive: DriveClient::new(),
    });

    // Build router
    let app = drive_relay::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("drive_relay=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
