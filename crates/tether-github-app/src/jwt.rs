// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! App JWTs used to exchange for installation tokens.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::AuthError;

/// GitHub caps App JWTs at ten minutes.
pub const JWT_LIFETIME: Duration = Duration::from_secs(10 * 60);
/// Backdating for clock drift between us and GitHub.
const CLOCK_DRIFT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppClaims {
	pub iat: u64,
	pub exp: u64,
	/// GitHub App numeric id.
	pub iss: String,
}

impl AppClaims {
	/// Claims for `github_app_id` issued at `now` (seconds since epoch).
	pub fn new(github_app_id: u64, now: u64) -> Self {
		let iat = now.saturating_sub(CLOCK_DRIFT.as_secs());
		Self {
			iat,
			exp: iat + JWT_LIFETIME.as_secs(),
			iss: github_app_id.to_string(),
		}
	}

	pub fn now(github_app_id: u64) -> Self {
		let now = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.unwrap_or_default()
			.as_secs();
		Self::new(github_app_id, now)
	}
}

/// Signs App JWTs. Injected so token exchange can be tested without RSA keys.
pub trait JwtSigner: Send + Sync {
	fn sign(&self, private_key_pem: &str, claims: &AppClaims) -> Result<String, AuthError>;
}

/// RS256 signing with the App's PEM private key.
#[derive(Debug, Default, Clone, Copy)]
pub struct Rs256Signer;

impl JwtSigner for Rs256Signer {
	#[instrument(skip(self, private_key_pem), fields(iss = %claims.iss))]
	fn sign(&self, private_key_pem: &str, claims: &AppClaims) -> Result<String, AuthError> {
		let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
			.map_err(|e| AuthError::InvalidKey(e.to_string()))?;

		let token = encode(&Header::new(Algorithm::RS256), claims, &encoding_key)
			.map_err(|e| AuthError::InvalidKey(format!("failed to encode JWT: {e}")))?;

		debug!(exp = claims.exp, "signed App JWT");
		Ok(token)
	}
}
