// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod credential;
pub mod file;
pub mod user;

pub use credential::StoredCredential;
pub use file::FileSummary;
pub use user::{User, UserProfile};
