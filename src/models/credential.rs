//! Stored OAuth credential for the authorization-code variant.

use serde::{Deserialize, Serialize};

/// A user's OAuth token pair (sealed before storage in Firestore).
///
/// The access token and expiry are replaced on every refresh; the refresh
/// token is replaced only when Google rotates it. Records are never
/// proactively deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    /// Sealed access token (base64)
    pub access_token_sealed: String,
    /// Sealed refresh token (base64)
    pub refresh_token_sealed: String,
    /// When the access token expires (RFC3339)
    pub expires_at: String,
    /// Granted OAuth scopes
    pub scopes: Vec<String>,
}
