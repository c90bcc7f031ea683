//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Google subject identifier (also used as document ID)
    pub id: String,
    /// Email address from the verified ID token
    pub email: String,
    /// Display name
    pub name: String,
    /// Profile photo URL (may be None if not shared)
    pub photo: Option<String>,
    /// When the user first signed in
    pub created_at: String,
    /// Last sign-in timestamp
    pub last_login: String,
}

/// Public profile shape returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub photo: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            photo: user.photo.clone(),
        }
    }
}
