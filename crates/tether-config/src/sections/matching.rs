// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Package-to-App matching limits.

use serde::{Deserialize, Serialize};

const DEFAULT_AUTO_DISCOVERY_MAX_APPS: usize = 5;
const DEFAULT_LISTING_CAP: usize = 500;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MatchingConfigLayer {
	pub auto_discovery_max_apps: Option<usize>,
	pub listing_cap: Option<usize>,
}

impl MatchingConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.auto_discovery_max_apps.is_some() {
			self.auto_discovery_max_apps = other.auto_discovery_max_apps;
		}
		if other.listing_cap.is_some() {
			self.listing_cap = other.listing_cap;
		}
	}

	pub fn finalize(self) -> MatchingConfig {
		MatchingConfig {
			auto_discovery_max_apps: self
				.auto_discovery_max_apps
				.unwrap_or(DEFAULT_AUTO_DISCOVERY_MAX_APPS),
			listing_cap: self.listing_cap.unwrap_or(DEFAULT_LISTING_CAP).max(1),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchingConfig {
	/// Repository auto-discovery is skipped when more Apps than this are
	/// configured.
	pub auto_discovery_max_apps: usize,
	/// Maximum items collected from one paginated GitHub listing.
	pub listing_cap: usize,
}

impl Default for MatchingConfig {
	fn default() -> Self {
		MatchingConfigLayer::default().finalize()
	}
}
