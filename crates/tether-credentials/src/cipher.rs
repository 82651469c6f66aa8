// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! AES-256-GCM encryption for App secrets at rest.
//!
//! Stored form is `v1:` followed by base64 of `nonce || ciphertext`. The empty
//! string encrypts to the empty string so unset secrets stay recognisable.

use std::fmt;

use aes_gcm::{
	aead::{Aead, KeyInit, OsRng},
	Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;
use tether_common_secret::SecretString;
use zeroize::Zeroizing;

use crate::error::CredentialError;

pub const KEY_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 12;
const VERSION_PREFIX: &str = "v1:";

#[derive(Clone)]
pub struct Cipher {
	key: Zeroizing<[u8; KEY_SIZE]>,
}

impl fmt::Debug for Cipher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Cipher").field("key", &"[REDACTED]").finish()
	}
}

impl Cipher {
	pub fn new(key: [u8; KEY_SIZE]) -> Self {
		Self {
			key: Zeroizing::new(key),
		}
	}

	/// Build from the base64 form used in configuration.
	pub fn from_base64(encoded: &str) -> Result<Self, CredentialError> {
		let bytes = Zeroizing::new(
			STANDARD
				.decode(encoded.trim())
				.map_err(|e| CredentialError::InvalidKey(format!("not base64: {e}")))?,
		);

		if bytes.len() != KEY_SIZE {
			return Err(CredentialError::InvalidKey(format!(
				"expected {KEY_SIZE} bytes, got {}",
				bytes.len()
			)));
		}

		let mut key = [0u8; KEY_SIZE];
		key.copy_from_slice(&bytes);
		Ok(Self::new(key))
	}

	/// A random key, base64 encoded, for provisioning.
	pub fn generate_base64_key() -> String {
		let mut key = Zeroizing::new([0u8; KEY_SIZE]);
		OsRng.fill_bytes(key.as_mut());
		STANDARD.encode(key.as_slice())
	}

	pub fn encrypt(&self, plaintext: &SecretString) -> Result<String, CredentialError> {
		if plaintext.is_empty() {
			return Ok(String::new());
		}

		let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.key.as_slice()));

		let mut nonce_bytes = [0u8; NONCE_SIZE];
		OsRng.fill_bytes(&mut nonce_bytes);
		let nonce = Nonce::from_slice(&nonce_bytes);

		let ciphertext = cipher
			.encrypt(nonce, plaintext.expose().as_bytes())
			.map_err(|e| CredentialError::Encryption(e.to_string()))?;

		let mut payload = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
		payload.extend_from_slice(&nonce_bytes);
		payload.extend_from_slice(&ciphertext);

		Ok(format!("{VERSION_PREFIX}{}", STANDARD.encode(payload)))
	}

	pub fn decrypt(&self, stored: &str) -> Result<SecretString, CredentialError> {
		if stored.is_empty() {
			return Ok(SecretString::empty());
		}

		let encoded = stored
			.strip_prefix(VERSION_PREFIX)
			.ok_or_else(|| CredentialError::Decryption("unknown envelope version".to_string()))?;

		let payload = STANDARD
			.decode(encoded)
			.map_err(|e| CredentialError::Decryption(format!("not base64: {e}")))?;

		if payload.len() <= NONCE_SIZE {
			return Err(CredentialError::Decryption("payload too short".to_string()));
		}

		let (nonce_bytes, ciphertext) = payload.split_at(NONCE_SIZE);
		let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.key.as_slice()));

		let plaintext = Zeroizing::new(
			cipher
				.decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
				.map_err(|e| CredentialError::Decryption(e.to_string()))?,
		);

		let text = std::str::from_utf8(&plaintext)
			.map_err(|_| CredentialError::Decryption("plaintext is not UTF-8".to_string()))?;

		Ok(SecretString::new(text.to_string()))
	}
}
