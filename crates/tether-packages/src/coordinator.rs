// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Install and rollback of release archives, single-flight per repository.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tether_common_core::{AppId, RepoSlug};
use tether_github_app::{ApiError, RepositoryApi};
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::error::{is_auth_failure, OpError};
use crate::host::PackageInstaller;
use crate::journal::{OperationJournal, OperationKind, OperationRecord, OperationState};
use crate::resolver::ReleaseResolver;
use crate::types::Package;

struct Holder {
	generation: u64,
	acquired_at: Instant,
}

/// Per-repository operation locks. A holder older than the operation deadline
/// is treated as abandoned and its lock can be taken over.
#[derive(Default)]
pub struct RepoLocks {
	held: Mutex<HashMap<RepoSlug, Holder>>,
	generations: AtomicU64,
}

impl RepoLocks {
	fn held(&self) -> MutexGuard<'_, HashMap<RepoSlug, Holder>> {
		self.held.lock().unwrap_or_else(|e| e.into_inner())
	}

	pub fn try_acquire(&self, repo: &RepoSlug, deadline: Duration) -> Result<RepoLockGuard<'_>, OpError> {
		let now = Instant::now();
		let mut held = self.held();

		if let Some(holder) = held.get(repo) {
			if now.duration_since(holder.acquired_at) < deadline {
				return Err(OpError::OperationInProgress(repo.clone()));
			}
			warn!(repo = %repo, "Reclaiming operation lock from an abandoned holder");
		}

		let generation = self.generations.fetch_add(1, Ordering::Relaxed);
		held.insert(
			repo.clone(),
			Holder {
				generation,
				acquired_at: now,
			},
		);

		Ok(RepoLockGuard {
			locks: self,
			repo: repo.clone(),
			generation,
		})
	}

	pub fn is_held(&self, repo: &RepoSlug) -> bool {
		self.held().contains_key(repo)
	}
}

/// Releases the lock on drop, unless it has since been reclaimed.
pub struct RepoLockGuard<'a> {
	locks: &'a RepoLocks,
	repo: RepoSlug,
	generation: u64,
}

impl Drop for RepoLockGuard<'_> {
	fn drop(&mut self) {
		let mut held = self.locks.held();
		if held
			.get(&self.repo)
			.is_some_and(|h| h.generation == self.generation)
		{
			held.remove(&self.repo);
		}
	}
}

pub struct PackageOperationCoordinator {
	resolver: Arc<ReleaseResolver>,
	repos: Arc<dyn RepositoryApi>,
	installer: Arc<dyn PackageInstaller>,
	journal: Arc<OperationJournal>,
	locks: RepoLocks,
	deadline: Duration,
}

impl PackageOperationCoordinator {
	pub fn new(
		resolver: Arc<ReleaseResolver>,
		repos: Arc<dyn RepositoryApi>,
		installer: Arc<dyn PackageInstaller>,
		journal: Arc<OperationJournal>,
		deadline: Duration,
	) -> Self {
		Self {
			resolver,
			repos,
			installer,
			journal,
			locks: RepoLocks::default(),
			deadline,
		}
	}

	pub fn locks(&self) -> &RepoLocks {
		&self.locks
	}

	pub async fn install(&self, package: &Package, version: &str) -> Result<OperationRecord, OpError> {
		self.run(OperationKind::Install, package, version).await
	}

	/// Same flow as install. Reinstalling the current version is allowed.
	pub async fn rollback(&self, package: &Package, version: &str) -> Result<OperationRecord, OpError> {
		self.run(OperationKind::Rollback, package, version).await
	}

	#[instrument(skip(self, package), fields(repo = %package.repo, slug = %package.slug, %kind))]
	async fn run(
		&self,
		kind: OperationKind,
		package: &Package,
		version: &str,
	) -> Result<OperationRecord, OpError> {
		let Some(app) = package.app_id.clone() else {
			return Err(OpError::Unauthorized {
				repo: package.repo.clone(),
				reason: "package is not linked to a GitHub App".to_string(),
			});
		};

		let _guard = self.locks.try_acquire(&package.repo, self.deadline)?;
		info!(version, "Starting package operation");

		let mut record = OperationRecord::start(kind, package, app.clone(), version);
		let mut progress = Progress::default();

		let outcome = tokio::time::timeout(
			self.deadline,
			self.execute(&app, package, version, &mut progress),
		)
		.await
		.unwrap_or_else(|_| Err(OpError::Timeout));

		record.tag = progress.tag;
		match &outcome {
			Ok(()) => {
				self.resolver.invalidate(&package.repo);
				record.finish(OperationState::Done);
				info!(version, "Package operation complete");
			}
			Err(e) => {
				error!(version, stage = ?progress.state, error = %e, "Package operation failed");
				record.finish(OperationState::Failed(e.to_string()));
			}
		}

		self.journal.record(record.clone());
		outcome.map(|()| record)
	}

	async fn execute(
		&self,
		app: &AppId,
		package: &Package,
		version: &str,
		progress: &mut Progress,
	) -> Result<(), OpError> {
		progress.state = OperationState::Resolving;
		let release = self
			.resolver
			.find_release(app, &package.repo, version)
			.await
			.map_err(|e| {
				if e.is_timeout() {
					OpError::Timeout
				} else if e.is_auth() {
					OpError::Unauthorized {
						repo: package.repo.clone(),
						reason: e.to_string(),
					}
				} else {
					OpError::Resolve(e)
				}
			})?
			.ok_or_else(|| OpError::VersionNotFound {
				repo: package.repo.clone(),
				version: version.to_string(),
			})?;
		progress.tag = Some(release.tag_name.clone());

		progress.state = OperationState::Downloading;
		let archive = self
			.repos
			.download_asset(app, &release)
			.await
			.map_err(|e| match e {
				ApiError::Timeout => OpError::Timeout,
				e if is_auth_failure(&e) => OpError::Unauthorized {
					repo: package.repo.clone(),
					reason: e.to_string(),
				},
				e => OpError::DownloadFailed(e),
			})?;

		progress.state = OperationState::Installing;
		self
			.installer
			.install_package_archive(package.kind, &package.slug, archive)
			.await
			.map_err(OpError::InstallFailed)
	}
}

#[derive(Default)]
struct Progress {
	state: OperationState,
	tag: Option<String>,
}
