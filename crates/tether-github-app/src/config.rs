// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Settings for talking to the GitHub REST API.

use std::time::Duration;

use tether_common_http::RetryConfig;
use url::Url;

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

#[derive(Debug, Clone)]
pub struct GithubApiConfig {
	/// Validated HTTPS base, always ending in `/` so relative joins append.
	base_url: Url,
	/// Deadline for one API call, retries included.
	pub request_timeout: Duration,
	/// Deadline for one asset download.
	pub download_timeout: Duration,
	pub retry_config: RetryConfig,
	/// Maximum items collected from one paginated listing.
	pub listing_cap: usize,
	pub max_download_bytes: u64,
	/// Installation tokens are dropped this long before GitHub expires them.
	pub token_skew: Duration,
	/// Backoff window after a rate limit without a usable Retry-After.
	pub backoff: Duration,
}

impl GithubApiConfig {
	pub fn new(base_url: &str) -> Result<Self, ApiError> {
		Ok(Self::with_url(validate_and_normalize_base_url(base_url)?))
	}

	fn with_url(base_url: Url) -> Self {
		Self {
			base_url,
			request_timeout: Duration::from_secs(10),
			download_timeout: Duration::from_secs(120),
			retry_config: RetryConfig::default(),
			listing_cap: 500,
			max_download_bytes: 100 * 1024 * 1024,
			token_skew: Duration::from_secs(60),
			backoff: Duration::from_secs(60),
		}
	}

	/// Skips HTTPS/localhost validation so tests can target a mock server.
	#[cfg(test)]
	pub(crate) fn for_mock_server(uri: &str) -> Self {
		let mut url = Url::parse(uri).expect("mock server uri");
		if !url.path().ends_with('/') {
			let path = format!("{}/", url.path());
			url.set_path(&path);
		}
		let mut config = Self::with_url(url);
		config.retry_config = RetryConfig::none();
		config
	}

	/// Shared HTTP client for token exchange and API calls.
	pub fn http_client(&self) -> Result<reqwest::Client, ApiError> {
		tether_common_http::builder()
			.connect_timeout(self.request_timeout)
			.build()
			.map_err(|e| ApiError::Config(format!("Failed to create HTTP client: {e}")))
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
		self
			.base_url
			.join(path.trim_start_matches('/'))
			.map_err(|e| ApiError::Config(format!("Invalid URL for {path}: {e}")))
	}

	/// Whether `url` points at the configured API host, so it may carry a
	/// token.
	pub(crate) fn is_same_origin(&self, url: &Url) -> bool {
		url.scheme() == self.base_url.scheme()
			&& url.host_str() == self.base_url.host_str()
			&& url.port_or_known_default() == self.base_url.port_or_known_default()
	}
}

impl Default for GithubApiConfig {
	fn default() -> Self {
		Self::with_url(Url::parse(DEFAULT_BASE_URL).expect("default URL is valid"))
	}
}

fn validate_and_normalize_base_url(raw: &str) -> Result<Url, ApiError> {
	let mut url = Url::parse(raw.trim())
		.map_err(|e| ApiError::Config(format!("Invalid GitHub base URL '{raw}': {e}")))?;

	if url.scheme() != "https" {
		return Err(ApiError::Config(format!(
			"GitHub base URL must use https, got '{}'",
			url.scheme()
		)));
	}

	let host = url
		.host_str()
		.ok_or_else(|| ApiError::Config("GitHub base URL must include a host".to_string()))?;

	if host == "localhost" || host == "127.0.0.1" || host == "::1" || host == "[::1]" {
		return Err(ApiError::Config(
			"GitHub base URL must not be localhost".to_string(),
		));
	}

	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());
		url.set_path(&path);
	}

	Ok(url)
}
