// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sealing of OAuth tokens before they are written to Firestore.
//!
//! AES-256-GCM with a key derived from the configured master key via
//! HKDF-SHA256. The sealed form is `base64(nonce || ciphertext || tag)`
//! and the AAD binds a sealed token to its owning user id.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hkdf::Hkdf;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;

use crate::error::AppError;

const HKDF_SALT: &[u8] = b"drive-relay.credential-sealing.v1";
const HKDF_INFO: &[u8] = b"aes-256-gcm";

/// Token sealing service.
#[derive(Clone)]
pub struct TokenCipher {
    key: Arc<LessSafeKey>,
    rng: SystemRandom,
}

impl TokenCipher {
    /// Derive the sealing key from the master key.
    pub fn new(master_key: &[u8]) -> Result<Self, AppError> {
        let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), master_key);
        let mut okm = [0u8; 32];
        hk.expand(HKDF_INFO, &mut okm)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("HKDF expand failed")))?;

        let unbound = UnboundKey::new(&AES_256_GCM, &okm)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Sealing key init failed")))?;

        Ok(Self {
            key: Arc::new(LessSafeKey::new(unbound)),
            rng: SystemRandom::new(),
        })
    }

    /// Seal a token for storage. Returns base64.
    pub fn seal(&self, plaintext: &str, aad: &[u8]) -> Result<String, AppError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Nonce generation failed")))?;

        let nonce = Nonce::assume_unique_for_key(nonce_bytes);
        let mut in_out = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(nonce, Aad::from(aad), &mut in_out)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Token sealing failed")))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);
        Ok(BASE64.encode(sealed))
    }

    /// Open a sealed token. Expects base64 as produced by `seal`.
    pub fn open(&self, sealed_b64: &str, aad: &[u8]) -> Result<String, AppError> {
        let sealed = BASE64
            .decode(sealed_b64)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Sealed token decode failed: {}", e)))?;

        if sealed.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Sealed token too short"
            )));
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid nonce")))?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from(aad), &mut in_out)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Token unsealing failed")))?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("UTF-8 decode failed: {}", e)))
    }
}

/// Helper to seal an OAuth token pair before storing.
pub fn seal_tokens(
    cipher: &TokenCipher,
    access_token: &str,
    refresh_token: &str,
    user_id: &str,
) -> Result<(String, String), AppError> {
    let sealed_access = cipher.seal(access_token, user_id.as_bytes())?;
    let sealed_refresh = cipher.seal(refresh_token, user_id.as_bytes())?;
    Ok((sealed_access, sealed_refresh))
}

/// Helper to open an OAuth token pair after retrieval.
pub fn open_tokens(
    cipher: &TokenCipher,
    sealed_access: &str,
    sealed_refresh: &str,
    user_id: &str,
) -> Result<(String, String), AppError> {
    let access_token = cipher.open(sealed_access, user_id.as_bytes())?;
    let refresh_token = cipher.open(sealed_refresh, user_id.as_bytes())?;
    Ok((access_token, refresh_token))
}
