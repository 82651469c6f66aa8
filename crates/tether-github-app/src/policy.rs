// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Refresh-once handling of rejected installation tokens.

use std::future::Future;

use tether_common_core::AppId;
use tether_common_secret::SecretString;
use tracing::info;

use crate::error::ApiError;
use crate::token::TokenSource;

/// Runs an authenticated call, and on a 401 or a non-rate-limit 403 drops the
/// cached token and tries again with a fresh one.
#[derive(Debug, Clone, Copy)]
pub struct AuthRetryPolicy {
	max_attempts: u32,
}

impl Default for AuthRetryPolicy {
	fn default() -> Self {
		Self::refresh_once()
	}
}

impl AuthRetryPolicy {
	/// One call plus one retry with a refreshed token.
	pub const fn refresh_once() -> Self {
		Self { max_attempts: 2 }
	}

	pub fn max_attempts(&self) -> u32 {
		self.max_attempts
	}

	pub async fn run<T, F, Fut>(
		&self,
		tokens: &dyn TokenSource,
		app: &AppId,
		mut call: F,
	) -> Result<T, ApiError>
	where
		F: FnMut(SecretString) -> Fut,
		Fut: Future<Output = Result<T, ApiError>>,
	{
		let mut attempt = 1;
		loop {
			let token = tokens.installation_token(app).await?;
			match call(token.token).await {
				Err(e) if e.is_auth_rejection() && attempt < self.max_attempts => {
					info!(app_id = %app, error = %e, "Token rejected, refreshing installation token");
					tokens.invalidate(app);
					attempt += 1;
				}
				other => return other,
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::AuthError;
	use crate::token::InstallationToken;
	use async_trait::async_trait;
	use chrono::Utc;
	use std::sync::atomic::{AtomicU32, Ordering};

	#[derive(Default)]
	struct CountingTokens {
		issued: AtomicU32,
		invalidated: AtomicU32,
	}

	#[async_trait]
	impl TokenSource for CountingTokens {
		async fn installation_token(&self, _app: &AppId) -> Result<InstallationToken, AuthError> {
			let n = self.issued.fetch_add(1, Ordering::SeqCst);
			Ok(InstallationToken {
				token: SecretString::new(format!("token-{n}")),
				expires_at: Utc::now(),
			})
		}

		fn invalidate(&self, _app: &AppId) {
			self.invalidated.fetch_add(1, Ordering::SeqCst);
		}
	}

	struct NoTokens;

	#[async_trait]
	impl TokenSource for NoTokens {
		async fn installation_token(&self, app: &AppId) -> Result<InstallationToken, AuthError> {
			Err(AuthError::MissingCredentials(app.clone()))
		}

		fn invalidate(&self, _app: &AppId) {}
	}

	#[tokio::test]
	async fn success_uses_a_single_token() {
		let tokens = CountingTokens::default();
		let result = AuthRetryPolicy::refresh_once()
			.run(&tokens, &AppId::from("a"), |token| async move {
				Ok::<_, ApiError>(token.expose().clone())
			})
			.await
			.unwrap();

		assert_eq!(result, "token-0");
		assert_eq!(tokens.issued.load(Ordering::SeqCst), 1);
		assert_eq!(tokens.invalidated.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn unauthorized_refreshes_exactly_once() {
		let tokens = CountingTokens::default();
		let result = AuthRetryPolicy::refresh_once()
			.run(&tokens, &AppId::from("a"), |token| async move {
				if token.expose() == "token-0" {
					Err(ApiError::Unauthorized)
				} else {
					Ok(token.expose().clone())
				}
			})
			.await
			.unwrap();

		assert_eq!(result, "token-1");
		assert_eq!(tokens.invalidated.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn persistent_rejection_surfaces_after_two_attempts() {
		let tokens = CountingTokens::default();
		let calls = AtomicU32::new(0);
		let err = AuthRetryPolicy::refresh_once()
			.run(&tokens, &AppId::from("a"), |_| {
				calls.fetch_add(1, Ordering::SeqCst);
				async { Err::<(), _>(ApiError::Forbidden("Resource not accessible".to_string())) }
			})
			.await
			.unwrap_err();

		assert!(matches!(err, ApiError::Forbidden(_)));
		assert_eq!(calls.load(Ordering::SeqCst), 2);
		assert_eq!(tokens.issued.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn rate_limits_are_not_retried() {
		let tokens = CountingTokens::default();
		let calls = AtomicU32::new(0);
		let err = AuthRetryPolicy::refresh_once()
			.run(&tokens, &AppId::from("a"), |_| {
				calls.fetch_add(1, Ordering::SeqCst);
				async { Err::<(), _>(ApiError::RateLimited { retry_after: None }) }
			})
			.await
			.unwrap_err();

		assert!(err.is_rate_limit());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(tokens.invalidated.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn token_failures_propagate_as_auth_errors() {
		let err = AuthRetryPolicy::refresh_once()
			.run(&NoTokens, &AppId::from("a"), |_| async { Ok::<_, ApiError>(()) })
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			ApiError::Auth(AuthError::MissingCredentials(_))
		));
	}
}
