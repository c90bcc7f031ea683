// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod authorizer;
pub mod drive;
pub mod identity;
pub mod oauth;
pub mod token_cipher;

pub use authorizer::{Authorizer, CodeFlowAuthorizer, DelegationAuthorizer};
pub use drive::DriveClient;
pub use identity::{GoogleIdVerifier, IdentityError, VerifiedIdentity};
pub use oauth::GoogleTokenClient;
pub use token_cipher::TokenCipher;
