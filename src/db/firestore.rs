// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage, upserted on sign-in)
//! - Credentials (sealed OAuth token pairs, code-flow variant)
//!
//! Besides the real client there is an in-memory backend for integration
//! tests and an offline mock whose operations always fail.

use std::sync::Arc;

use dashmap::DashMap;

use crate::db::collections;
use crate::error::AppError;
use crate::models::{StoredCredential, User};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(MemoryStore),
    Offline,
}

#[derive(Clone, Default)]
struct MemoryStore {
    users: Arc<DashMap<String, User>>,
    credentials: Arc<DashMap<String, StoredCredential>>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // The emulator ignores credentials, but the client still wants a
        // token source; hand it a dummy JWT.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a mock client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            backend: Backend::Offline,
        }
    }

    /// Create an in-memory client for integration tests.
    pub fn new_in_memory() -> Self {
        Self {
            backend: Backend::Memory(MemoryStore::default()),
        }
    }

    /// Helper to get the real client or fail if this is a test backend.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        match &self.backend {
            Backend::Firestore(client) => Ok(client),
            Backend::Memory(_) | Backend::Offline => Err(AppError::Database(
                "Database not connected (offline mode)".to_string(),
            )),
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by their Google subject id.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        if let Backend::Memory(store) = &self.backend {
            return Ok(store.users.get(user_id).map(|u| u.clone()));
        }

        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        if let Backend::Memory(store) = &self.backend {
            store.users.insert(user.id.clone(), user.clone());
            return Ok(());
        }

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Credential Operations ───────────────────────────────────

    /// Get the sealed credential for a user.
    pub async fn get_credential(
        &self,
        user_id: &str,
    ) -> Result<Option<StoredCredential>, AppError> {
        if let Backend::Memory(store) = &self.backend {
            return Ok(store.credentials.get(user_id).map(|c| c.clone()));
        }

        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CREDENTIALS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store the sealed credential for a user.
    pub async fn set_credential(
        &self,
        user_id: &str,
        credential: &StoredCredential,
    ) -> Result<(), AppError> {
        if let Backend::Memory(store) = &self.backend {
            store
                .credentials
                .insert(user_id.to_string(), credential.clone());
            return Ok(());
        }

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CREDENTIALS)
            .document_id(user_id)
            .object(credential)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
