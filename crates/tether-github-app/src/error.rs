// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Error types for token exchange and the GitHub REST surface.

use std::time::Duration;

use tether_common_core::AppId;
use tether_common_http::RetryableError;
use tether_credentials::CredentialError;
use thiserror::Error;

/// Failures obtaining an installation access token.
#[derive(Debug, Error)]
pub enum AuthError {
	/// The App is unknown, not installed, or has no private key.
	#[error("App {0} has no usable credentials")]
	MissingCredentials(AppId),

	#[error("Invalid App private key: {0}")]
	InvalidKey(String),

	#[error("GitHub rejected the token exchange: {status} - {body}")]
	GitHubRejected { status: u16, body: String },

	#[error("Network error: {0}")]
	Network(#[source] reqwest::Error),

	#[error("Token exchange timed out")]
	Timeout,

	#[error("Invalid token response from GitHub: {0}")]
	InvalidResponse(String),

	#[error(transparent)]
	Credentials(#[from] CredentialError),
}

/// Failures of GitHub API calls made on behalf of an App.
#[derive(Debug, Error)]
pub enum ApiError {
	#[error(transparent)]
	Auth(#[from] AuthError),

	#[error("Unauthorized: the installation token was rejected")]
	Unauthorized,

	#[error("Forbidden: {0}")]
	Forbidden(String),

	#[error("Rate limit exceeded")]
	RateLimited { retry_after: Option<Duration> },

	/// A recent rate limit is still in effect for this App.
	#[error("Backing off from GitHub for another {}s", remaining.as_secs())]
	Backoff { remaining: Duration },

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("GitHub API error: {status} - {message}")]
	Status { status: u16, message: String },

	#[error("Network error: {0}")]
	Network(#[source] reqwest::Error),

	#[error("Request timed out")]
	Timeout,

	#[error("Invalid response from GitHub: {0}")]
	InvalidResponse(String),

	#[error("Download exceeds the {limit} byte limit")]
	TooLarge { limit: u64 },

	#[error("Configuration error: {0}")]
	Config(String),
}

impl ApiError {
	/// Errors the refresh-once policy answers with a new token.
	pub fn is_auth_rejection(&self) -> bool {
		matches!(self, ApiError::Unauthorized | ApiError::Forbidden(_))
	}

	pub fn is_rate_limit(&self) -> bool {
		matches!(self, ApiError::RateLimited { .. } | ApiError::Backoff { .. })
	}
}

impl From<reqwest::Error> for ApiError {
	fn from(e: reqwest::Error) -> Self {
		if e.is_timeout() {
			ApiError::Timeout
		} else {
			ApiError::Network(e)
		}
	}
}

impl RetryableError for ApiError {
	fn is_retryable(&self) -> bool {
		match self {
			ApiError::Network(e) => e.is_retryable(),
			ApiError::Timeout => true,
			ApiError::Status { status, .. } => *status >= 500,
			_ => false,
		}
	}
}
