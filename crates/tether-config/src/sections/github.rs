// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! GitHub API configuration section.
//!
//! App credentials are not configured here; they live in the credential store,
//! one record per connected App.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GithubConfigLayer {
	pub api_base_url: Option<String>,
	pub request_timeout_secs: Option<u64>,
	pub retry_max_attempts: Option<u32>,
}

impl GithubConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.api_base_url.is_some() {
			self.api_base_url = other.api_base_url;
		}
		if other.request_timeout_secs.is_some() {
			self.request_timeout_secs = other.request_timeout_secs;
		}
		if other.retry_max_attempts.is_some() {
			self.retry_max_attempts = other.retry_max_attempts;
		}
	}

	pub fn finalize(self) -> Result<GithubConfig, ConfigError> {
		let api_base_url = self
			.api_base_url
			.unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
			.trim_end_matches('/')
			.to_string();
		validate_api_base_url(&api_base_url)?;

		let request_timeout_secs = self
			.request_timeout_secs
			.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
		if request_timeout_secs == 0 {
			return Err(ConfigError::InvalidValue {
				key: "github.request_timeout_secs".to_string(),
				message: "must be greater than zero".to_string(),
			});
		}

		Ok(GithubConfig {
			api_base_url,
			request_timeout_secs,
			retry_max_attempts: self
				.retry_max_attempts
				.unwrap_or(DEFAULT_RETRY_MAX_ATTEMPTS)
				.max(1),
		})
	}
}

fn validate_api_base_url(url: &str) -> Result<(), ConfigError> {
	if !url.starts_with("https://") {
		return Err(ConfigError::Validation(format!(
			"github.api_base_url must use HTTPS, got: {url}"
		)));
	}

	if url.contains("localhost") || url.contains("127.0.0.1") || url.contains("::1") {
		return Err(ConfigError::Validation(
			"github.api_base_url must not be localhost".to_string(),
		));
	}

	Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GithubConfig {
	pub api_base_url: String,
	pub request_timeout_secs: u64,
	pub retry_max_attempts: u32,
}

impl Default for GithubConfig {
	fn default() -> Self {
		Self {
			api_base_url: DEFAULT_API_BASE_URL.to_string(),
			request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
			retry_max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
		}
	}
}
