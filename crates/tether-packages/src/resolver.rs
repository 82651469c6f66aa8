// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Release lists, cached under `releases:{owner/repo}`, and channel
//! selection over them.

use std::sync::Arc;
use std::time::Duration;

use tether_cache::{keys, Cache, CacheExt};
use tether_common_core::{AppId, RepoSlug};
use tether_github_app::{Release, RepositoryApi};
use tracing::{debug, instrument, warn};

use crate::error::ResolveError;
use crate::types::ReleaseChannel;
use crate::version::{newest_first, tag_matches};

pub struct ReleaseResolver {
	repos: Arc<dyn RepositoryApi>,
	cache: Arc<dyn Cache>,
	release_ttl: Duration,
}

impl ReleaseResolver {
	pub fn new(repos: Arc<dyn RepositoryApi>, cache: Arc<dyn Cache>, release_ttl: Duration) -> Self {
		Self {
			repos,
			cache,
			release_ttl,
		}
	}

	/// Non-draft releases of `repo`, served from cache while fresh.
	#[instrument(skip(self), fields(app_id = %app, repo = %repo))]
	pub async fn releases(&self, app: &AppId, repo: &RepoSlug) -> Result<Vec<Release>, ResolveError> {
		if let Some(cached) = self.cache.get_as::<Vec<Release>>(&keys::releases(repo.as_str())) {
			debug!(count = cached.len(), "Using cached releases");
			return Ok(cached);
		}
		self.fetch(app, repo).await
	}

	async fn fetch(&self, app: &AppId, repo: &RepoSlug) -> Result<Vec<Release>, ResolveError> {
		let listing = self.repos.list_releases(app, repo).await?;
		if listing.truncated {
			warn!(repo = %repo, kept = listing.items.len(), "Release list truncated");
		}

		let mut releases = listing.items;
		releases.sort_by(|a, b| b.published_at.cmp(&a.published_at));
		self
			.cache
			.set_as(&keys::releases(repo.as_str()), &releases, self.release_ttl);
		Ok(releases)
	}

	/// Newest release on `channel`. `Ok(None)` when the repository has no
	/// matching release.
	#[instrument(skip(self), fields(app_id = %app, repo = %repo, %channel))]
	pub async fn resolve_latest(
		&self,
		app: &AppId,
		repo: &RepoSlug,
		channel: ReleaseChannel,
	) -> Result<Option<Release>, ResolveError> {
		let releases = self.releases(app, repo).await?;
		Ok(select_latest(&releases, channel))
	}

	/// The release tagged `version`. A miss against cached data is retried
	/// once against GitHub before giving up.
	#[instrument(skip(self), fields(app_id = %app, repo = %repo))]
	pub async fn find_release(
		&self,
		app: &AppId,
		repo: &RepoSlug,
		version: &str,
	) -> Result<Option<Release>, ResolveError> {
		let key = keys::releases(repo.as_str());
		if let Some(cached) = self.cache.get_as::<Vec<Release>>(&key) {
			if let Some(found) = find_tag(&cached, version) {
				return Ok(Some(found));
			}
			debug!(version, "Tag not in cached releases, refetching");
		}

		let fresh = self.fetch(app, repo).await?;
		Ok(find_tag(&fresh, version))
	}

	pub fn invalidate(&self, repo: &RepoSlug) -> bool {
		self.cache.invalidate(&keys::releases(repo.as_str()))
	}
}

/// An exact tag match is preferred over a match that ignores the `v` prefix.
fn find_tag(releases: &[Release], version: &str) -> Option<Release> {
	releases
		.iter()
		.find(|r| r.tag_name == version)
		.or_else(|| releases.iter().find(|r| tag_matches(&r.tag_name, version)))
		.cloned()
}

/// Channel filter followed by newest-first ordering.
///
/// Stable takes full releases only. Other channels take prereleases whose tag
/// contains the channel name; when none do, the most recently published
/// prerelease is used.
pub fn select_latest(releases: &[Release], channel: ReleaseChannel) -> Option<Release> {
	let mut candidates: Vec<&Release> = match channel.tag_token() {
		None => releases.iter().filter(|r| !r.prerelease).collect(),
		Some(token) => {
			let prereleases: Vec<&Release> = releases.iter().filter(|r| r.prerelease).collect();
			let tagged: Vec<&Release> = prereleases
				.iter()
				.copied()
				.filter(|r| r.tag_name.to_lowercase().contains(token))
				.collect();

			if tagged.is_empty() {
				prereleases
					.into_iter()
					.enumerate()
					.max_by(|(ia, a), (ib, b)| a.published_at.cmp(&b.published_at).then(ib.cmp(ia)))
					.map(|(_, r)| r)
					.into_iter()
					.collect()
			} else {
				tagged
			}
		}
	};

	candidates.sort_by(|a, b| newest_first(a, b));
	candidates.first().map(|r| (*r).clone())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{release, FakeRepos};
	use tether_cache::MemoryCache;
	use tether_github_app::ApiError;

	fn repo() -> RepoSlug {
		RepoSlug::parse("owner/r").unwrap()
	}

	fn tags(r: Option<Release>) -> Option<String> {
		r.map(|r| r.tag_name)
	}

	#[test]
	fn stable_picks_the_highest_full_release() {
		let releases = vec![
			release("v1.0.0", false, 100),
			release("v1.2.0", false, 200),
			release("v1.1.0", true, 300),
		];
		assert_eq!(
			tags(select_latest(&releases, ReleaseChannel::Stable)).as_deref(),
			Some("v1.2.0")
		);
	}

	#[test]
	fn channels_filter_on_the_tag_token() {
		let releases = vec![
			release("v1.0.0", false, 100),
			release("v1.1.0-beta", true, 200),
		];
		assert_eq!(
			tags(select_latest(&releases, ReleaseChannel::Beta)).as_deref(),
			Some("v1.1.0-beta")
		);
		assert_eq!(
			tags(select_latest(&releases, ReleaseChannel::Stable)).as_deref(),
			Some("v1.0.0")
		);
	}

	#[test]
	fn channel_match_is_case_insensitive_and_prefers_the_highest_version() {
		let releases = vec![
			release("v2.0.0-BETA.1", true, 100),
			release("v2.0.0-beta.2", true, 50),
			release("v2.0.0-alpha.9", true, 300),
		];
		assert_eq!(
			tags(select_latest(&releases, ReleaseChannel::Beta)).as_deref(),
			Some("v2.0.0-beta.2")
		);
	}

	#[test]
	fn untagged_channel_falls_back_to_the_newest_prerelease() {
		let releases = vec![
			release("v3.0.0-rc.1", true, 100),
			release("v3.0.0-rc.2", true, 200),
			release("v2.0.0", false, 300),
		];
		assert_eq!(
			tags(select_latest(&releases, ReleaseChannel::Alpha)).as_deref(),
			Some("v3.0.0-rc.2")
		);
	}

	#[test]
	fn no_candidates_is_none() {
		assert_eq!(select_latest(&[], ReleaseChannel::Stable), None);
		let only_pre = vec![release("v1.0.0-beta", true, 1)];
		assert_eq!(select_latest(&only_pre, ReleaseChannel::Stable), None);
		let only_stable = vec![release("v1.0.0", false, 1)];
		assert_eq!(select_latest(&only_stable, ReleaseChannel::Develop), None);
	}

	#[tokio::test]
	async fn empty_repository_resolves_to_none() {
		let repos = Arc::new(FakeRepos::default());
		repos.set_releases(&repo(), vec![]);
		let resolver = ReleaseResolver::new(repos, Arc::new(MemoryCache::new()), Duration::from_secs(300));

		let latest = resolver
			.resolve_latest(&AppId::from("a"), &repo(), ReleaseChannel::Stable)
			.await
			.unwrap();
		assert_eq!(latest, None);
	}

	#[tokio::test]
	async fn api_failures_are_errors_not_empty() {
		let repos = Arc::new(FakeRepos::default());
		repos.fail_releases(&repo(), || ApiError::Timeout);
		let resolver = ReleaseResolver::new(repos, Arc::new(MemoryCache::new()), Duration::from_secs(300));

		let err = resolver
			.resolve_latest(&AppId::from("a"), &repo(), ReleaseChannel::Stable)
			.await
			.unwrap_err();
		assert!(matches!(err, ResolveError::Api(ApiError::Timeout)));
	}

	#[tokio::test(start_paused = true)]
	async fn releases_are_cached_until_the_ttl() {
		let repos = Arc::new(FakeRepos::default());
		repos.set_releases(&repo(), vec![release("v1.0.0", false, 1)]);
		let resolver = ReleaseResolver::new(
			Arc::clone(&repos) as Arc<dyn RepositoryApi>,
			Arc::new(MemoryCache::new()),
			Duration::from_secs(300),
		);
		let app = AppId::from("a");

		resolver.releases(&app, &repo()).await.unwrap();
		resolver.releases(&app, &repo()).await.unwrap();
		assert_eq!(repos.release_calls(), 1);

		tokio::time::advance(Duration::from_secs(301)).await;
		resolver.releases(&app, &repo()).await.unwrap();
		assert_eq!(repos.release_calls(), 2);
	}

	#[tokio::test]
	async fn find_release_refetches_on_a_cached_miss() {
		let repos = Arc::new(FakeRepos::default());
		repos.set_releases(&repo(), vec![release("v1.0.0", false, 1)]);
		let resolver = ReleaseResolver::new(
			Arc::clone(&repos) as Arc<dyn RepositoryApi>,
			Arc::new(MemoryCache::new()),
			Duration::from_secs(300),
		);
		let app = AppId::from("a");
		resolver.releases(&app, &repo()).await.unwrap();

		repos.set_releases(
			&repo(),
			vec![release("v1.1.0", false, 2), release("v1.0.0", false, 1)],
		);
		let found = resolver.find_release(&app, &repo(), "1.1.0").await.unwrap();
		assert_eq!(tags(found).as_deref(), Some("v1.1.0"));

		let missing = resolver.find_release(&app, &repo(), "9.9.9").await.unwrap();
		assert_eq!(missing, None);
		assert_eq!(repos.release_calls(), 3);
	}

	#[test]
	fn exact_tags_win_over_prefix_insensitive_matches() {
		let releases = vec![release("1.0.0", false, 1), release("v1.0.0", false, 2)];
		assert_eq!(
			find_tag(&releases, "v1.0.0").map(|r| r.published_at),
			Some(releases[1].published_at)
		);
	}
}
