// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authorization resolver: produces a valid Drive access token for an
//! authenticated user, using the strategy of the deployed variant.
//!
//! - Implicit: the browser holds the token and supplies it per request.
//! - Code flow: persisted refresh/access pair, refreshed synchronously
//!   before the downstream call when expired.
//! - Delegation: a service account mints impersonation tokens scoped to
//!   the signed-in user's email.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::ServiceAccountKey;
use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::middleware::auth::SessionUser;
use crate::models::StoredCredential;
use crate::services::oauth::{GoogleTokenClient, TokenResponse};
use crate::services::token_cipher::{self, TokenCipher};
use crate::time_utils::{format_utc_rfc3339, parse_utc_rfc3339};

/// Scope requested for all Drive access.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Header through which the implicit front end reports its token expiry.
pub const TOKEN_EXPIRY_HEADER: &str = "x-token-expiry";

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Lifetime of a signed impersonation assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

const HTTP_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Cached access token with expiry information.
#[derive(Clone)]
pub struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Shared token cache type for use in AppState.
pub type TokenCache = Arc<DashMap<String, CachedToken>>;

/// Shared refresh locks type for use in AppState.
pub type RefreshLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Per-variant authorization strategy.
#[derive(Clone)]
pub enum Authorizer {
    /// Token supplied by the client on each request; no server state.
    Implicit,
    /// Authorization-code flow with persisted credentials.
    CodeFlow(CodeFlowAuthorizer),
    /// Domain-wide delegation via service-account impersonation.
    Delegation(DelegationAuthorizer),
}

impl Authorizer {
    /// Resolve a valid access token for the given session user.
    pub async fn resolve(
        &self,
        user: &SessionUser,
        headers: &HeaderMap,
    ) -> Result<String, AppError> {
        match self {
            Authorizer::Implicit => client_supplied_token(headers),
            Authorizer::CodeFlow(auth) => auth.access_token(&user.id).await,
            Authorizer::Delegation(auth) => auth.access_token(&user.email).await,
        }
    }

    /// Handle an authorization-code exchange (code-flow variant only).
    pub async fn exchange_code(&self, user_id: &str, code: &str) -> Result<(), AppError> {
        match self {
            Authorizer::CodeFlow(auth) => auth.exchange_code(user_id, code).await,
            _ => Err(AppError::BadRequest(
                "authorization-code exchange is not enabled for this deployment".to_string(),
            )),
        }
    }
}

/// Implicit-variant resolution: read the token from the request itself.
///
/// The front end owns the token lifecycle; the server only refuses to
/// forward a token the client itself reports as expired. On any failure
/// the client must re-run the consent popup.
fn client_supplied_token(headers: &HeaderMap) -> Result<String, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Authorization("no access token supplied".to_string()))?;

    if let Some(raw) = headers
        .get(TOKEN_EXPIRY_HEADER)
        .and_then(|h| h.to_str().ok())
    {
        let expires_at = parse_utc_rfc3339(raw).map_err(|_| {
            AppError::BadRequest(format!("invalid {} header", TOKEN_EXPIRY_HEADER))
        })?;
        if expires_at <= Utc::now() {
            return Err(AppError::Authorization(
                "access token expired".to_string(),
            ));
        }
    }

    Ok(token.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Code-flow authorizer
// ─────────────────────────────────────────────────────────────────────────────

/// Authorization-code variant: manages the persisted credential lifecycle.
///
/// This service encapsulates:
/// - Code exchange and credential creation
/// - Automatic token refresh when expiring (with 5-minute margin)
/// - Re-sealing and storage of refreshed tokens
/// - In-memory token caching to avoid unsealing on every request
/// - Per-user locking so concurrent requests trigger a single refresh
#[derive(Clone)]
pub struct CodeFlowAuthorizer {
    tokens: GoogleTokenClient,
    db: FirestoreDb,
    cipher: TokenCipher,
    /// In-memory cache of unsealed access tokens (shared across requests).
    token_cache: TokenCache,
    /// Per-user mutex to serialize token refresh operations.
    refresh_locks: RefreshLocks,
}

impl CodeFlowAuthorizer {
    /// Create a new code-flow authorizer with shared token cache.
    ///
    /// The `token_cache` and `refresh_locks` should be shared across all
    /// instances within a server process.
    pub fn new(
        tokens: GoogleTokenClient,
        db: FirestoreDb,
        cipher: TokenCipher,
        token_cache: TokenCache,
        refresh_locks: RefreshLocks,
    ) -> Self {
        Self {
            tokens,
            db,
            cipher,
            token_cache,
            refresh_locks,
        }
    }

    /// Exchange an authorization code and persist the resulting credential.
    pub async fn exchange_code(&self, user_id: &str, code: &str) -> Result<(), AppError> {
        let response = self.tokens.exchange_code(code).await?;

        let refresh_token = response.refresh_token.clone().ok_or_else(|| {
            AppError::Authorization(
                "token response did not include a refresh token".to_string(),
            )
        })?;

        let expires_at = Utc::now() + Duration::seconds(response.expires_in);

        let (sealed_access, sealed_refresh) = token_cipher::seal_tokens(
            &self.cipher,
            &response.access_token,
            &refresh_token,
            user_id,
        )?;

        let mut scopes = response.scopes();
        if scopes.is_empty() {
            scopes.push(DRIVE_SCOPE.to_string());
        }

        let credential = StoredCredential {
            access_token_sealed: sealed_access,
            refresh_token_sealed: sealed_refresh,
            expires_at: format_utc_rfc3339(expires_at),
            scopes,
        };

        self.db.set_credential(user_id, &credential).await?;

        self.token_cache.insert(
            user_id.to_string(),
            CachedToken {
                access_token: response.access_token,
                expires_at,
            },
        );

        tracing::info!(user_id, "Authorization code exchanged, credential stored");
        Ok(())
    }

    /// Get a valid (non-expired) access token for the given user.
    ///
    /// Resolution order:
    /// 1. Check in-memory cache (fast path, no I/O)
    /// 2. Acquire the per-user lock, re-check the cache
    /// 3. Load and unseal the stored credential
    /// 4. If still valid, cache and return
    /// 5. If expired, refresh synchronously, persist, cache, return
    pub async fn access_token(&self, user_id: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);

        if let Some(cached) = self.token_cache.get(user_id) {
            if now + margin < cached.expires_at {
                return Ok(cached.access_token.clone());
            }
            // Expired or expiring soon - fall through to refresh
        }

        // Only one task per user performs the refresh; the rest wait here.
        let lock = self
            .refresh_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let _guard = lock.lock().await;

        // Another task may have refreshed while we were waiting.
        if let Some(cached) = self.token_cache.get(user_id) {
            if now + margin < cached.expires_at {
                return Ok(cached.access_token.clone());
            }
        }

        let credential = self.db.get_credential(user_id).await?.ok_or_else(|| {
            AppError::Authorization(
                "no stored credential; complete the authorization flow first".to_string(),
            )
        })?;

        let access_token = self
            .cipher
            .open(&credential.access_token_sealed, user_id.as_bytes())?;
        let expires_at = parse_utc_rfc3339(&credential.expires_at)?;

        if now + margin < expires_at {
            self.token_cache.insert(
                user_id.to_string(),
                CachedToken {
                    access_token: access_token.clone(),
                    expires_at,
                },
            );
            return Ok(access_token);
        }

        tracing::info!(user_id, "Access token expired, refreshing");

        let refresh_token = self
            .cipher
            .open(&credential.refresh_token_sealed, user_id.as_bytes())?;

        let response = match self.tokens.refresh(&refresh_token).await {
            Ok(r) => r,
            Err(AppError::Authorization(_)) => {
                // Another server instance may have rotated the pair already
                // and invalidated our refresh token; if its refreshed
                // credential is in the store, use that one.
                if let Some(token) = self.fetch_rotated_credential(user_id).await? {
                    tracing::info!(user_id, "Refresh race detected, using rotated credential");
                    return Ok(token);
                }
                return Err(AppError::Authorization(
                    "refresh token rejected; re-run the consent flow".to_string(),
                ));
            }
            Err(e) => return Err(e),
        };

        let new_expires_at = now + Duration::seconds(response.expires_in);
        // Google rotates the refresh token only occasionally.
        let new_refresh = response.refresh_token.clone().unwrap_or(refresh_token);

        let (sealed_access, sealed_refresh) = token_cipher::seal_tokens(
            &self.cipher,
            &response.access_token,
            &new_refresh,
            user_id,
        )?;

        let updated = StoredCredential {
            access_token_sealed: sealed_access,
            refresh_token_sealed: sealed_refresh,
            expires_at: format_utc_rfc3339(new_expires_at),
            scopes: credential.scopes.clone(),
        };

        self.db.set_credential(user_id, &updated).await?;

        self.token_cache.insert(
            user_id.to_string(),
            CachedToken {
                access_token: response.access_token.clone(),
                expires_at: new_expires_at,
            },
        );

        tracing::info!(user_id, "Token refreshed and stored");
        Ok(response.access_token)
    }

    /// Reload the stored credential after a suspected refresh race.
    ///
    /// Returns the access token only if the stored copy is still valid;
    /// a revoked refresh token leaves an expired record and yields `None`.
    async fn fetch_rotated_credential(&self, user_id: &str) -> Result<Option<String>, AppError> {
        let Some(credential) = self.db.get_credential(user_id).await? else {
            return Ok(None);
        };

        let expires_at = parse_utc_rfc3339(&credential.expires_at)?;
        if Utc::now() + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) >= expires_at {
            return Ok(None);
        }

        let access_token = self
            .cipher
            .open(&credential.access_token_sealed, user_id.as_bytes())?;

        self.token_cache.insert(
            user_id.to_string(),
            CachedToken {
                access_token: access_token.clone(),
                expires_at,
            },
        );

        Ok(Some(access_token))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Delegation authorizer
// ─────────────────────────────────────────────────────────────────────────────

/// Domain-wide delegation: mints impersonation tokens from a
/// service-account key, scoped to the target user's email.
///
/// Minted tokens are cached per subject until near expiry.
#[derive(Clone)]
pub struct DelegationAuthorizer {
    key: Arc<ServiceAccountKey>,
    signing_key: Arc<EncodingKey>,
    http: reqwest::Client,
    token_cache: TokenCache,
}

/// JWT assertion exchanged for an impersonation token.
#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    sub: &'a str,
    iat: i64,
    exp: i64,
}

impl DelegationAuthorizer {
    /// Create a new delegation authorizer.
    ///
    /// The RSA private key is parsed once here so a malformed key fails
    /// at startup rather than on the first request.
    pub fn new(key: ServiceAccountKey) -> Result<Self, AppError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "Invalid service-account private key: {}",
                e
            ))
        })?;

        Ok(Self {
            key: Arc::new(key),
            signing_key: Arc::new(signing_key),
            http: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            token_cache: Arc::new(DashMap::new()),
        })
    }

    /// Mint (or reuse) an impersonation token for the given user email.
    pub async fn access_token(&self, subject_email: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);

        if let Some(cached) = self.token_cache.get(subject_email) {
            if now + margin < cached.expires_at {
                return Ok(cached.access_token.clone());
            }
        }

        let assertion = self.mint_assertion(subject_email, now)?;

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Token endpoint request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body,
                subject = %subject_email,
                "Impersonation token request rejected"
            );
            return Err(AppError::Authorization(format!(
                "impersonation token request returned status {}",
                status
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse token response: {}", e)))?;

        let expires_at = now + Duration::seconds(token.expires_in);
        self.token_cache.insert(
            subject_email.to_string(),
            CachedToken {
                access_token: token.access_token.clone(),
                expires_at,
            },
        );

        tracing::info!(subject = %subject_email, "Minted impersonation token");
        Ok(token.access_token)
    }

    /// Sign the RS256 assertion naming the impersonated user.
    fn mint_assertion(
        &self,
        subject_email: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: DRIVE_SCOPE,
            aud: &self.key.token_uri,
            sub: subject_email,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign assertion: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_token_missing() {
        let headers = HeaderMap::new();
        assert!(matches!(
            client_supplied_token(&headers),
            Err(AppError::Authorization(_))
        ));
    }

    #[test]
    fn test_client_token_not_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(client_supplied_token(&headers).is_err());
    }

    #[test]
    fn test_client_token_valid() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer ya29.token"),
        );
        assert_eq!(client_supplied_token(&headers).unwrap(), "ya29.token");
    }

    #[test]
    fn test_client_token_expired() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer ya29.token"),
        );
        headers.insert(
            TOKEN_EXPIRY_HEADER,
            HeaderValue::from_static("2020-01-01T00:00:00Z"),
        );
        assert!(matches!(
            client_supplied_token(&headers),
            Err(AppError::Authorization(_))
        ));
    }

    #[test]
    fn test_client_token_future_expiry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer ya29.token"),
        );
        let future = format_utc_rfc3339(Utc::now() + Duration::hours(1));
        headers.insert(
            TOKEN_EXPIRY_HEADER,
            HeaderValue::from_str(&future).unwrap(),
        );
        assert!(client_supplied_token(&headers).is_ok());
    }

    #[test]
    fn test_client_token_bad_expiry_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer ya29.token"),
        );
        headers.insert(TOKEN_EXPIRY_HEADER, HeaderValue::from_static("soon"));
        assert!(matches!(
            client_supplied_token(&headers),
            Err(AppError::BadRequest(_))
        ));
    }
}
