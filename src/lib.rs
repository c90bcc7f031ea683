// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Drive-Relay: backend API for the Google sign-in / Drive demo apps.
//!
//! This crate provides a small API server demonstrating three Google
//! OAuth 2.0 / OpenID Connect integration variants for listing a user's
//! most recently modified Drive files: implicit (client-held token),
//! authorization-code with refresh-token persistence, and domain-wide
//! delegation via a service account.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use db::FirestoreDb;
use services::{Authorizer, DriveClient, GoogleIdVerifier};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub identity: Arc<GoogleIdVerifier>,
    pub authorizer: Authorizer,
    pub drive: DriveClient,
}
