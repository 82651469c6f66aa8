// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Installation access tokens, cached under `token:{app id}`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tether_cache::{keys, Cache, CacheExt};
use tether_common_core::AppId;
use tether_common_secret::SecretString;
use tether_credentials::CredentialStore;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, trace};

use crate::config::GithubApiConfig;
use crate::error::AuthError;
use crate::jwt::{AppClaims, JwtSigner, Rs256Signer};

/// A short-lived token scoped to one App installation.
#[derive(Debug, Clone)]
pub struct InstallationToken {
	pub token: SecretString,
	pub expires_at: DateTime<Utc>,
}

/// Cache form. [`SecretString`] serializes as `[REDACTED]`, so the raw value
/// is carried here.
#[derive(Serialize, Deserialize)]
struct CachedToken {
	token: String,
	expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct AccessTokenResponse {
	token: String,
	expires_at: String,
}

/// Anything that can hand out installation tokens for an App.
#[async_trait]
pub trait TokenSource: Send + Sync {
	async fn installation_token(&self, app: &AppId) -> Result<InstallationToken, AuthError>;

	/// Drop the cached token so the next call exchanges a fresh one.
	fn invalidate(&self, app: &AppId);
}

/// Exchanges App JWTs for installation tokens.
///
/// Exchanges are serialized per App: concurrent callers on a cold cache wait
/// for one exchange and share its token. Failures are never retried here.
pub struct TokenProvider {
	http: Client,
	config: GithubApiConfig,
	credentials: Arc<CredentialStore>,
	cache: Arc<dyn Cache>,
	signer: Arc<dyn JwtSigner>,
	locks: Mutex<HashMap<AppId, Arc<Mutex<()>>>>,
}

impl TokenProvider {
	pub fn new(
		http: Client,
		config: GithubApiConfig,
		credentials: Arc<CredentialStore>,
		cache: Arc<dyn Cache>,
	) -> Self {
		Self {
			http,
			config,
			credentials,
			cache,
			signer: Arc::new(Rs256Signer),
			locks: Mutex::new(HashMap::new()),
		}
	}

	pub fn with_signer(mut self, signer: Arc<dyn JwtSigner>) -> Self {
		self.signer = signer;
		self
	}

	async fn app_lock(&self, app: &AppId) -> Arc<Mutex<()>> {
		let mut locks = self.locks.lock().await;
		locks
			.entry(app.clone())
			.or_insert_with(|| Arc::new(Mutex::new(())))
			.clone()
	}

	fn cached(&self, app: &AppId) -> Option<InstallationToken> {
		let cached: CachedToken = self.cache.get_as(&keys::token(app.as_str()))?;
		Some(InstallationToken {
			token: SecretString::new(cached.token),
			expires_at: cached.expires_at,
		})
	}

	async fn exchange(&self, app: &AppId) -> Result<InstallationToken, AuthError> {
		let record = self
			.credentials
			.find(app)
			.await?
			.ok_or_else(|| AuthError::MissingCredentials(app.clone()))?;

		if record.installation_id == 0 || record.app_id == 0 || record.private_key.is_empty() {
			return Err(AuthError::MissingCredentials(app.clone()));
		}

		let claims = AppClaims::now(record.app_id);
		let jwt = self.signer.sign(record.private_key.expose(), &claims)?;

		let url = self
			.config
			.base_url()
			.join(&format!(
				"app/installations/{}/access_tokens",
				record.installation_id
			))
			.map_err(|e| AuthError::InvalidResponse(format!("Invalid URL: {e}")))?;

		let request = self
			.http
			.post(url)
			.header("Authorization", format!("Bearer {jwt}"))
			.header("Accept", "application/vnd.github+json")
			.header("X-GitHub-Api-Version", "2022-11-28")
			.send();

		let response = tokio::time::timeout(self.config.request_timeout, request)
			.await
			.map_err(|_| {
				error!(app_id = %app, "Installation token request timed out");
				AuthError::Timeout
			})?
			.map_err(|e| {
				if e.is_timeout() {
					return AuthError::Timeout;
				}
				error!(app_id = %app, error = %e, "Network error fetching installation token");
				AuthError::Network(e)
			})?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			error!(app_id = %app, status = status.as_u16(), "GitHub rejected the token exchange");
			return Err(AuthError::GitHubRejected {
				status: status.as_u16(),
				body,
			});
		}

		let body: AccessTokenResponse = response.json().await.map_err(|e| {
			error!(error = %e, "Failed to parse access token response");
			AuthError::InvalidResponse(format!("JSON parse error: {e}"))
		})?;

		let expires_at: DateTime<Utc> = body.expires_at.parse().map_err(|e| {
			AuthError::InvalidResponse(format!("Invalid expires_at: {} - {e}", body.expires_at))
		})?;

		Ok(InstallationToken {
			token: SecretString::new(body.token),
			expires_at,
		})
	}
}

/// How long a token may be served from cache.
fn cache_ttl(expires_at: DateTime<Utc>, now: DateTime<Utc>, skew: Duration) -> Duration {
	expires_at
		.signed_duration_since(now)
		.to_std()
		.unwrap_or(Duration::ZERO)
		.saturating_sub(skew)
}

#[async_trait]
impl TokenSource for TokenProvider {
	#[instrument(skip(self), fields(app_id = %app))]
	async fn installation_token(&self, app: &AppId) -> Result<InstallationToken, AuthError> {
		if let Some(token) = self.cached(app) {
			trace!("Using cached installation token");
			return Ok(token);
		}

		let lock = self.app_lock(app).await;
		let _guard = lock.lock().await;

		if let Some(token) = self.cached(app) {
			trace!("Using cached installation token (post-lock)");
			return Ok(token);
		}

		debug!("Fetching new installation token");
		let token = self.exchange(app).await?;

		let ttl = cache_ttl(token.expires_at, Utc::now(), self.config.token_skew);
		self.cache.set_as(
			&keys::token(app.as_str()),
			&CachedToken {
				token: token.token.expose().clone(),
				expires_at: token.expires_at,
			},
			ttl,
		);

		info!(ttl_secs = ttl.as_secs(), "Installation token refreshed");
		Ok(token)
	}

	fn invalidate(&self, app: &AppId) {
		if self.cache.invalidate(&keys::token(app.as_str())) {
			info!(app_id = %app, "Invalidated installation token");
		}
	}
}
