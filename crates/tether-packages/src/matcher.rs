// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Links packages to the GitHub App that can read their repository.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tether_cache::{keys, Cache, CacheExt};
use tether_common_core::{AppId, RepoSlug};
use tether_credentials::App;
use tether_github_app::RepositoryApi;
use tracing::{debug, info, instrument, warn};

use crate::types::Package;

/// Explicit `managed_repositories` assignments win. Unclaimed packages fall
/// back to the repository lists of installed Apps, unless more Apps are
/// configured than `max_auto_apps`. Ties go to the earliest App.
pub struct AppMatcher {
	repos: Arc<dyn RepositoryApi>,
	cache: Arc<dyn Cache>,
	repository_ttl: Duration,
	max_auto_apps: usize,
}

impl AppMatcher {
	pub fn new(
		repos: Arc<dyn RepositoryApi>,
		cache: Arc<dyn Cache>,
		repository_ttl: Duration,
		max_auto_apps: usize,
	) -> Self {
		Self {
			repos,
			cache,
			repository_ttl,
			max_auto_apps,
		}
	}

	#[instrument(skip_all, fields(packages = packages.len(), apps = apps.len()))]
	pub async fn match_packages(&self, packages: Vec<Package>, apps: &[App]) -> Vec<Package> {
		let mut discovered: Option<HashMap<AppId, Vec<RepoSlug>>> = None;
		let mut matched = Vec::with_capacity(packages.len());

		for mut package in packages {
			package.app_id = None;

			let explicit: Vec<&App> = apps.iter().filter(|a| a.manages(&package.repo)).collect();
			if let Some(first) = explicit.first() {
				if explicit.len() > 1 {
					warn!(
						repo = %package.repo,
						chosen = %first.id,
						claimants = explicit.len(),
						"Repository explicitly assigned to several Apps, using the first"
					);
				}
				package.app_id = Some(first.id.clone());
				matched.push(package);
				continue;
			}

			if apps.len() > self.max_auto_apps {
				matched.push(package);
				continue;
			}

			if discovered.is_none() {
				discovered = Some(self.repository_lists(apps).await);
			}
			let lists = discovered.as_ref();

			let claimants: Vec<&AppId> = apps
				.iter()
				.filter(|a| {
					lists
						.and_then(|l| l.get(&a.id))
						.is_some_and(|repos| repos.contains(&package.repo))
				})
				.map(|a| &a.id)
				.collect();

			if let Some(first) = claimants.first() {
				if claimants.len() > 1 {
					warn!(
						repo = %package.repo,
						chosen = %first,
						claimants = claimants.len(),
						"Repository readable by several Apps, using the first"
					);
				}
				package.app_id = Some((*first).clone());
			}
			matched.push(package);
		}

		if apps.len() > self.max_auto_apps {
			debug!(
				apps = apps.len(),
				max = self.max_auto_apps,
				"Too many Apps for repository auto-discovery"
			);
		}

		matched
	}

	/// Repository lists of installed Apps, from cache where possible. Apps
	/// whose list cannot be fetched are skipped for this pass.
	async fn repository_lists(&self, apps: &[App]) -> HashMap<AppId, Vec<RepoSlug>> {
		let mut lists = HashMap::new();

		for app in apps.iter().filter(|a| a.is_installed()) {
			let key = keys::repositories(app.id.as_str());
			if let Some(repos) = self.cache.get_as::<Vec<RepoSlug>>(&key) {
				lists.insert(app.id.clone(), repos);
				continue;
			}

			match self.repos.list_repositories(&app.id).await {
				Ok(listing) => {
					info!(app_id = %app.id, count = listing.items.len(), "Cached App repository list");
					self.cache.set_as(&key, &listing.items, self.repository_ttl);
					lists.insert(app.id.clone(), listing.items);
				}
				Err(e) => {
					warn!(app_id = %app.id, error = %e, "Could not list App repositories");
				}
			}
		}

		lists
	}
}
