// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The surface exposed to the host: listing, sync, install, rollback, App
//! assignment and webhook intake.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tether_cache::{keys, Cache, CacheExt};
use tether_common_core::{AppId, RepoSlug};
use tether_credentials::{App, CredentialError, CredentialStore, OptionStore};
use tether_github_app::RepositoryApi;
use tracing::{info, instrument};

use crate::coordinator::PackageOperationCoordinator;
use crate::decision::UpdateDecisionEngine;
use crate::discovery::PackageDiscovery;
use crate::error::{PackageError, Result};
use crate::events::{event_channel, purge_app_caches, EventSender, InvalidationHandler, TrustedDelivery, WebhookEvent};
use crate::host::{HostPackages, PackageInstaller};
use crate::journal::{OperationJournal, OperationRecord};
use crate::matcher::AppMatcher;
use crate::preferences::ChannelPreferences;
use crate::resolver::ReleaseResolver;
use crate::settings::EngineSettings;
use crate::types::{Package, PackageKind, PackageView, ReleaseChannel};

/// Collaborators injected into [`PackageService`].
pub struct ServiceDeps {
	pub host: Arc<dyn HostPackages>,
	pub installer: Arc<dyn PackageInstaller>,
	pub repos: Arc<dyn RepositoryApi>,
	pub credentials: Arc<CredentialStore>,
	pub options: Arc<dyn OptionStore>,
	pub cache: Arc<dyn Cache>,
}

pub struct PackageService {
	discovery: PackageDiscovery,
	matcher: AppMatcher,
	resolver: Arc<ReleaseResolver>,
	engine: UpdateDecisionEngine,
	coordinator: PackageOperationCoordinator,
	credentials: Arc<CredentialStore>,
	preferences: ChannelPreferences,
	journal: Arc<OperationJournal>,
	cache: Arc<dyn Cache>,
	events: EventSender,
	aggregate_deadline: Duration,
}

impl PackageService {
	/// Build the service and the handler that applies its webhook events. The
	/// handler must be driven (usually spawned) by the caller; it stops once
	/// the service is dropped.
	pub fn new(deps: ServiceDeps, settings: EngineSettings) -> (Self, InvalidationHandler) {
		let resolver = Arc::new(ReleaseResolver::new(
			Arc::clone(&deps.repos),
			Arc::clone(&deps.cache),
			settings.release_ttl,
		));
		let journal = Arc::new(OperationJournal::new(settings.journal_capacity));
		let (events, handler) = event_channel(
			settings.event_capacity,
			Arc::clone(&deps.cache),
			Arc::clone(&deps.credentials),
		);

		let service = Self {
			discovery: PackageDiscovery::new(deps.host),
			matcher: AppMatcher::new(
				Arc::clone(&deps.repos),
				Arc::clone(&deps.cache),
				settings.repository_ttl,
				settings.auto_discovery_max_apps,
			),
			engine: UpdateDecisionEngine::new(Arc::clone(&resolver)),
			coordinator: PackageOperationCoordinator::new(
				Arc::clone(&resolver),
				deps.repos,
				deps.installer,
				Arc::clone(&journal),
				settings.operation_deadline,
			),
			resolver,
			credentials: deps.credentials,
			preferences: ChannelPreferences::new(deps.options),
			journal,
			cache: deps.cache,
			events,
			aggregate_deadline: settings.aggregate_deadline,
		};
		(service, handler)
	}

	/// Discovered packages, linked to their Apps and carrying their channel.
	pub async fn packages(&self) -> Result<Vec<Package>> {
		let discovered = self.discovery.discover()?;
		let apps = self.credentials.all().await?;
		let channels = self.preferences.all().await?;

		let mut packages = self.matcher.match_packages(discovered, &apps).await;
		for package in &mut packages {
			package.channel = channels.get(&package.repo).copied().unwrap_or_default();
		}
		Ok(packages)
	}

	/// Every discovered package with its update status.
	#[instrument(skip(self))]
	pub async fn list_packages(&self) -> Result<Vec<PackageView>> {
		tokio::time::timeout(self.aggregate_deadline, self.evaluate_all())
			.await
			.unwrap_or_else(|_| Err(PackageError::Timeout))
	}

	async fn evaluate_all(&self) -> Result<Vec<PackageView>> {
		let packages = self.packages().await?;
		let decisions = join_all(packages.iter().map(|p| self.engine.evaluate(p))).await;

		Ok(packages
			.into_iter()
			.zip(decisions)
			.map(|(package, decision)| PackageView {
				slug: package.slug,
				kind: package.kind,
				name: package.name,
				repo: package.repo,
				installed_version: package.installed_version,
				status: decision.status,
				channel: package.channel,
				app_id: package.app_id,
				latest_version: decision.latest.map(|r| r.tag_name),
			})
			.collect())
	}

	/// Drop cached repository lists and releases, then list again.
	#[instrument(skip(self))]
	pub async fn sync(&self) -> Result<Vec<PackageView>> {
		for app in self.credentials.all().await? {
			self.cache.invalidate(&keys::repositories(app.id.as_str()));
		}
		let discovered = self.discovery.discover()?;
		for package in &discovered {
			self.resolver.invalidate(&package.repo);
		}
		info!(packages = discovered.len(), "Caches refreshed");

		self.list_packages().await
	}

	/// `kind` picks between a plugin and a theme sharing `repo`.
	#[instrument(skip(self), fields(repo = %repo))]
	pub async fn install(&self, repo: &RepoSlug, kind: Option<PackageKind>, version: &str) -> Result<OperationRecord> {
		let package = self.locate(repo, kind).await?;
		Ok(self.coordinator.install(&package, version).await?)
	}

	#[instrument(skip(self), fields(repo = %repo))]
	pub async fn rollback(&self, repo: &RepoSlug, kind: Option<PackageKind>, version: &str) -> Result<OperationRecord> {
		let package = self.locate(repo, kind).await?;
		Ok(self.coordinator.rollback(&package, version).await?)
	}

	async fn locate(&self, repo: &RepoSlug, kind: Option<PackageKind>) -> Result<Package> {
		let packages = tokio::time::timeout(self.aggregate_deadline, self.packages())
			.await
			.unwrap_or_else(|_| Err(PackageError::Timeout))?;

		let mut matching = packages
			.into_iter()
			.filter(|p| &p.repo == repo && kind.map_or(true, |k| p.kind == k));
		let package = matching
			.next()
			.ok_or_else(|| PackageError::PackageNotFound(repo.clone()))?;
		if matching.next().is_some() {
			return Err(PackageError::AmbiguousPackage(repo.clone()));
		}
		Ok(package)
	}

	/// Explicitly assign `repo` to one App, taking it from any other.
	#[instrument(skip(self), fields(repo = %repo))]
	pub async fn assign(&self, app_id: &AppId, repo: &RepoSlug) -> Result<App> {
		self.credentials
			.assign_repository(app_id, repo)
			.await
			.map_err(|e| match e {
				CredentialError::NotFound(id) => PackageError::AppNotFound(id),
				other => other.into(),
			})
	}

	pub async fn set_channel(&self, repo: &RepoSlug, channel: ReleaseChannel) -> Result<()> {
		Ok(self.preferences.set(repo, channel).await?)
	}

	/// Delete an App and every cache entry it left behind.
	#[instrument(skip(self))]
	pub async fn disconnect_app(&self, app_id: &AppId) -> Result<App> {
		let app = self
			.credentials
			.delete(app_id)
			.await?
			.ok_or_else(|| PackageError::AppNotFound(app_id.clone()))?;

		let mut repos = app.managed_repositories.clone();
		let visible: Vec<RepoSlug> = self
			.cache
			.get_as(&keys::repositories(app_id.as_str()))
			.unwrap_or_default();
		for repo in visible {
			if !repos.contains(&repo) {
				repos.push(repo);
			}
		}
		purge_app_caches(self.cache.as_ref(), app_id, &repos);
		Ok(app)
	}

	pub fn credentials(&self) -> &Arc<CredentialStore> {
		&self.credentials
	}

	pub async fn apps(&self) -> Result<Vec<App>> {
		Ok(self.credentials.all().await?)
	}

	/// Completed and failed operations, newest first.
	pub fn journal(&self) -> Vec<OperationRecord> {
		self.journal.recent()
	}

	/// Parse a verified delivery and queue it for the invalidation handler.
	#[instrument(skip(self, delivery), fields(event = %delivery.event, app_id = %delivery.app_id))]
	pub async fn on_event(&self, delivery: &TrustedDelivery) -> Result<WebhookEvent> {
		let event = delivery.parse()?;
		self.events.send(event.clone()).await?;
		Ok(event)
	}
}
