// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Drive API client for the list-files proxy.

use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;
use crate::models::FileSummary;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// The proxy returns the 10 most recently modified files.
const PAGE_SIZE: &str = "10";
const ORDER_BY: &str = "modifiedTime desc";
const FIELDS: &str = "files(id,name,mimeType,modifiedTime)";

/// Drive API client.
#[derive(Clone)]
pub struct DriveClient {
    http: reqwest::Client,
    base_url: String,
}

impl DriveClient {
    /// Create a new Drive client.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    /// Create a Drive client against a non-default endpoint (tests).
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url,
        }
    }

    /// List the user's most recently modified files.
    ///
    /// Any non-success response from Drive is reported as an upstream
    /// error; no retry is performed.
    pub async fn list_recent_files(
        &self,
        access_token: &str,
    ) -> Result<Vec<FileSummary>, AppError> {
        let url = format!("{}/files", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("orderBy", ORDER_BY),
                ("pageSize", PAGE_SIZE),
                ("fields", FIELDS),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Drive request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Drive API returned non-success status");
            return Err(AppError::Upstream(format!("Drive API HTTP {}", status)));
        }

        let list: FileListResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Drive response: {}", e)))?;

        Ok(list.files)
    }
}

impl Default for DriveClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct FileListResponse {
    #[serde(default)]
    files: Vec<FileSummary>,
}
