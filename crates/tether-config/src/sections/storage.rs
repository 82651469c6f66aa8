// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Option storage and credential encryption.

use serde::{Deserialize, Serialize};
use tether_common_config::SecretString;

const DEFAULT_DATABASE_URL: &str = "sqlite:tether.db?mode=rwc";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfigLayer {
	pub database_url: Option<String>,
	/// Base64 AES-256 key used to encrypt App secrets at rest.
	#[serde(skip_serializing)]
	pub encryption_key: Option<SecretString>,
}

impl StorageConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.database_url.is_some() {
			self.database_url = other.database_url;
		}
		if other.encryption_key.is_some() {
			self.encryption_key = other.encryption_key;
		}
	}

	pub fn finalize(self) -> StorageConfig {
		StorageConfig {
			database_url: self
				.database_url
				.unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
			encryption_key: self.encryption_key.filter(|key| !key.is_empty()),
		}
	}
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
	pub database_url: String,
	pub encryption_key: Option<SecretString>,
}

impl Default for StorageConfig {
	fn default() -> Self {
		StorageConfigLayer::default().finalize()
	}
}
