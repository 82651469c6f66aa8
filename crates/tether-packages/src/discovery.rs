// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Finds installed plugins and themes whose Update URI is a GitHub slug.

use std::collections::HashSet;
use std::sync::Arc;

use tether_common_core::RepoSlug;
use tracing::{debug, instrument, warn};

use crate::error::ConfigError;
use crate::host::{HostError, HostPackages, InstalledPackage};
use crate::types::{Package, PackageKind, ReleaseChannel};

/// Parse an Update URI of the form `owner/repo`.
pub fn parse_update_uri(slug: &str, uri: &str) -> Result<RepoSlug, ConfigError> {
	RepoSlug::parse(uri).map_err(|_| ConfigError::MalformedUpdateUri {
		slug: slug.to_string(),
		uri: uri.to_string(),
	})
}

/// Scans host metadata on every call. Nothing is cached because plugins can
/// be added or removed between requests.
pub struct PackageDiscovery {
	host: Arc<dyn HostPackages>,
}

impl PackageDiscovery {
	pub fn new(host: Arc<dyn HostPackages>) -> Self {
		Self { host }
	}

	/// Unlinked packages on the stable channel, plugins first.
	#[instrument(skip(self))]
	pub fn discover(&self) -> Result<Vec<Package>, HostError> {
		let mut packages = collect(PackageKind::Plugin, self.host.list_installed_plugins()?);
		packages.extend(collect(PackageKind::Theme, self.host.list_installed_themes()?));
		debug!(count = packages.len(), "Discovered GitHub-backed packages");
		Ok(packages)
	}
}

fn collect(kind: PackageKind, installed: Vec<InstalledPackage>) -> Vec<Package> {
	let mut seen: HashSet<RepoSlug> = HashSet::new();
	let mut packages = Vec::new();

	for item in installed {
		let Some(uri) = item.update_uri.as_deref().filter(|u| !u.trim().is_empty()) else {
			continue;
		};

		let repo = match parse_update_uri(&item.slug, uri) {
			Ok(repo) => repo,
			Err(e) => {
				debug!(%kind, error = %e, "Skipping package");
				continue;
			}
		};

		if !seen.insert(repo.clone()) {
			warn!(%kind, slug = %item.slug, repo = %repo, "Repository already claimed by another package, keeping the first");
			continue;
		}

		packages.push(Package {
			name: if item.name.is_empty() {
				item.slug.clone()
			} else {
				item.name
			},
			slug: item.slug,
			kind,
			repo,
			installed_version: item.version.trim().to_string(),
			app_id: None,
			channel: ReleaseChannel::Stable,
		});
	}

	packages
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{installed, StaticHost};

	#[test]
	fn only_slug_shaped_update_uris_are_kept() {
		let host = StaticHost::new(
			vec![
				installed("widget", "1.0.0", Some("Acme/Widget")),
				installed("gallery", "2.0.0", Some("https://example.com/updates")),
				installed("forms", "3.0.0", None),
				installed("seo", "1.0.0", Some("acme/seo/extra")),
				installed("cache", "0.9", Some("acme/cache-tools")),
			],
			vec![installed("storefront", "1.4.0", Some("acme/storefront"))],
		);

		let packages = PackageDiscovery::new(Arc::new(host)).discover().unwrap();
		let found: Vec<_> = packages
			.iter()
			.map(|p| (p.kind, p.slug.as_str(), p.repo.as_str()))
			.collect();

		assert_eq!(
			found,
			vec![
				(PackageKind::Plugin, "widget", "acme/widget"),
				(PackageKind::Plugin, "cache", "acme/cache-tools"),
				(PackageKind::Theme, "storefront", "acme/storefront"),
			]
		);
		assert!(packages.iter().all(|p| p.app_id.is_none()));
		assert!(packages.iter().all(|p| p.channel == ReleaseChannel::Stable));
	}

	#[test]
	fn first_package_wins_a_repository_within_a_kind() {
		let host = StaticHost::new(
			vec![
				installed("widget", "1.0.0", Some("acme/widget")),
				installed("widget-fork", "1.0.0", Some("ACME/widget")),
			],
			vec![installed("widget-theme", "1.0.0", Some("acme/widget"))],
		);

		let packages = PackageDiscovery::new(Arc::new(host)).discover().unwrap();
		let slugs: Vec<_> = packages.iter().map(|p| p.slug.as_str()).collect();
		assert_eq!(slugs, vec!["widget", "widget-theme"]);
	}

	#[test]
	fn repeated_discovery_is_identical() {
		let host = Arc::new(StaticHost::new(
			vec![
				installed("widget", "1.0.0", Some("acme/widget")),
				installed("gadget", "", Some("acme/gadget")),
			],
			vec![],
		));
		let discovery = PackageDiscovery::new(host);

		let first: HashSet<_> = discovery.discover().unwrap().into_iter().collect();
		let second: HashSet<_> = discovery.discover().unwrap().into_iter().collect();
		assert_eq!(first, second);
	}

	#[test]
	fn malformed_uri_reports_the_package() {
		let err = parse_update_uri("gallery", "not a slug").unwrap_err();
		assert_eq!(
			err.to_string(),
			"gallery: Update URI 'not a slug' is not an owner/repo slug"
		);
	}
}
