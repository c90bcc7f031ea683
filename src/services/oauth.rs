// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for Google's OAuth 2.0 token endpoint.
//!
//! Handles:
//! - Authorization-code exchange (popup flow, `redirect_uri=postmessage`)
//! - Access-token refresh

use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;

const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// The popup code flow does not use a registered redirect URI.
const REDIRECT_URI_POSTMESSAGE: &str = "postmessage";

/// Google token endpoint client.
#[derive(Clone)]
pub struct GoogleTokenClient {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl GoogleTokenClient {
    /// Create a new token client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self::with_token_url(client_id, client_secret, DEFAULT_TOKEN_URL.to_string())
    }

    /// Create a token client against a non-default endpoint (tests).
    pub fn with_token_url(client_id: String, client_secret: String, token_url: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            token_url,
            client_id,
            client_secret,
        }
    }

    /// Exchange an authorization code for a token pair.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        self.post_form(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", REDIRECT_URI_POSTMESSAGE),
        ])
        .await
    }

    /// Refresh an expired access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AppError> {
        self.post_form(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn post_form(&self, params: &[(&str, &str)]) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Token endpoint request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Token endpoint rejected request");

            // A rejected grant means the code was consumed or the refresh
            // token was revoked; the caller must re-run the consent flow.
            if body.contains("invalid_grant") {
                return Err(AppError::Authorization(
                    "grant rejected by token endpoint".to_string(),
                ));
            }

            return Err(AppError::Authorization(format!(
                "token endpoint returned status {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse token response: {}", e)))
    }
}

/// Response from the token endpoint.
///
/// `refresh_token` is only present on the initial code exchange (and when
/// Google chooses to rotate it).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds, relative to now
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Split the space-delimited scope string, if any.
    pub fn scopes(&self) -> Vec<String> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_parse() {
        let raw = r#"{
            "access_token": "ya29.abc",
            "refresh_token": "1//xyz",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/drive.readonly openid",
            "token_type": "Bearer"
        }"#;

        let parsed: TokenResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.access_token, "ya29.abc");
        assert_eq!(parsed.refresh_token.as_deref(), Some("1//xyz"));
        assert_eq!(parsed.expires_in, 3599);
        assert_eq!(parsed.scopes().len(), 2);
    }

    #[test]
    fn test_refresh_response_without_refresh_token() {
        let raw = r#"{"access_token": "ya29.new", "expires_in": 3600}"#;
        let parsed: TokenResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.refresh_token.is_none());
        assert!(parsed.scopes().is_empty());
    }
}
