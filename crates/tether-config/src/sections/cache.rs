// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cache lifetime configuration section.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_RELEASE_TTL_SECS: u64 = 300;
const DEFAULT_REPOSITORY_TTL_SECS: u64 = 3600;
const DEFAULT_TOKEN_SKEW_SECS: u64 = 60;
const DEFAULT_BACKOFF_SECS: u64 = 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CacheConfigLayer {
	pub release_ttl_secs: Option<u64>,
	pub repository_ttl_secs: Option<u64>,
	pub token_skew_secs: Option<u64>,
	pub backoff_secs: Option<u64>,
}

impl CacheConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.release_ttl_secs.is_some() {
			self.release_ttl_secs = other.release_ttl_secs;
		}
		if other.repository_ttl_secs.is_some() {
			self.repository_ttl_secs = other.repository_ttl_secs;
		}
		if other.token_skew_secs.is_some() {
			self.token_skew_secs = other.token_skew_secs;
		}
		if other.backoff_secs.is_some() {
			self.backoff_secs = other.backoff_secs;
		}
	}

	pub fn finalize(self) -> CacheConfig {
		CacheConfig {
			release_ttl_secs: self.release_ttl_secs.unwrap_or(DEFAULT_RELEASE_TTL_SECS),
			repository_ttl_secs: self
				.repository_ttl_secs
				.unwrap_or(DEFAULT_REPOSITORY_TTL_SECS),
			token_skew_secs: self.token_skew_secs.unwrap_or(DEFAULT_TOKEN_SKEW_SECS),
			backoff_secs: self.backoff_secs.unwrap_or(DEFAULT_BACKOFF_SECS),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
	pub release_ttl_secs: u64,
	pub repository_ttl_secs: u64,
	pub token_skew_secs: u64,
	pub backoff_secs: u64,
}

impl CacheConfig {
	pub fn release_ttl(&self) -> Duration {
		Duration::from_secs(self.release_ttl_secs)
	}

	pub fn repository_ttl(&self) -> Duration {
		Duration::from_secs(self.repository_ttl_secs)
	}

	pub fn token_skew(&self) -> Duration {
		Duration::from_secs(self.token_skew_secs)
	}

	pub fn backoff(&self) -> Duration {
		Duration::from_secs(self.backoff_secs)
	}
}

impl Default for CacheConfig {
	fn default() -> Self {
		CacheConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_lifetimes() {
		let config = CacheConfig::default();
		assert_eq!(config.release_ttl(), Duration::from_secs(300));
		assert_eq!(config.repository_ttl(), Duration::from_secs(3600));
		assert_eq!(config.token_skew(), Duration::from_secs(60));
		assert_eq!(config.backoff(), Duration::from_secs(60));
	}

	#[test]
	fn partial_toml_layer() {
		let layer: CacheConfigLayer = toml::from_str("release_ttl_secs = 30").unwrap();
		let config = layer.finalize();
		assert_eq!(config.release_ttl_secs, 30);
		assert_eq!(config.repository_ttl_secs, 3600);
	}
}
