// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

/// Tunables of the package engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
	pub release_ttl: Duration,
	pub repository_ttl: Duration,
	/// Auto-discovery is skipped when more Apps than this are configured.
	pub auto_discovery_max_apps: usize,
	/// Upper bound on one install or rollback, and on how long a repository
	/// lock may be held before it counts as abandoned.
	pub operation_deadline: Duration,
	/// Upper bound on one listing pass across all packages.
	pub aggregate_deadline: Duration,
	pub journal_capacity: usize,
	pub event_capacity: usize,
}

impl Default for EngineSettings {
	fn default() -> Self {
		Self {
			release_ttl: Duration::from_secs(300),
			repository_ttl: Duration::from_secs(3600),
			auto_discovery_max_apps: 5,
			operation_deadline: Duration::from_secs(120),
			aggregate_deadline: Duration::from_secs(30),
			journal_capacity: 100,
			event_capacity: 64,
		}
	}
}
