// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Install/rollback and listing deadlines.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_DEADLINE_SECS: u64 = 120;
const DEFAULT_AGGREGATE_DEADLINE_SECS: u64 = 30;
const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 100 * 1024 * 1024;
const DEFAULT_JOURNAL_CAPACITY: usize = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OperationsConfigLayer {
	pub deadline_secs: Option<u64>,
	pub aggregate_deadline_secs: Option<u64>,
	pub max_download_bytes: Option<u64>,
	pub journal_capacity: Option<usize>,
}

impl OperationsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.deadline_secs.is_some() {
			self.deadline_secs = other.deadline_secs;
		}
		if other.aggregate_deadline_secs.is_some() {
			self.aggregate_deadline_secs = other.aggregate_deadline_secs;
		}
		if other.max_download_bytes.is_some() {
			self.max_download_bytes = other.max_download_bytes;
		}
		if other.journal_capacity.is_some() {
			self.journal_capacity = other.journal_capacity;
		}
	}

	pub fn finalize(self) -> Result<OperationsConfig, ConfigError> {
		let config = OperationsConfig {
			deadline_secs: self.deadline_secs.unwrap_or(DEFAULT_DEADLINE_SECS),
			aggregate_deadline_secs: self
				.aggregate_deadline_secs
				.unwrap_or(DEFAULT_AGGREGATE_DEADLINE_SECS),
			max_download_bytes: self.max_download_bytes.unwrap_or(DEFAULT_MAX_DOWNLOAD_BYTES),
			journal_capacity: self.journal_capacity.unwrap_or(DEFAULT_JOURNAL_CAPACITY),
		};

		for (key, value) in [
			("operations.deadline_secs", config.deadline_secs),
			(
				"operations.aggregate_deadline_secs",
				config.aggregate_deadline_secs,
			),
			("operations.max_download_bytes", config.max_download_bytes),
		] {
			if value == 0 {
				return Err(ConfigError::InvalidValue {
					key: key.to_string(),
					message: "must be greater than zero".to_string(),
				});
			}
		}

		Ok(config)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationsConfig {
	/// Upper bound for one install or rollback; a lock held longer is abandoned.
	pub deadline_secs: u64,
	/// Upper bound for a full listing pass across packages.
	pub aggregate_deadline_secs: u64,
	pub max_download_bytes: u64,
	pub journal_capacity: usize,
}

impl OperationsConfig {
	pub fn deadline(&self) -> Duration {
		Duration::from_secs(self.deadline_secs)
	}

	pub fn aggregate_deadline(&self) -> Duration {
		Duration::from_secs(self.aggregate_deadline_secs)
	}
}

impl Default for OperationsConfig {
	fn default() -> Self {
		Self {
			deadline_secs: DEFAULT_DEADLINE_SECS,
			aggregate_deadline_secs: DEFAULT_AGGREGATE_DEADLINE_SECS,
			max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
			journal_capacity: DEFAULT_JOURNAL_CAPACITY,
		}
	}
}
