// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Update decisions for linked packages.

use std::sync::Arc;

use tether_github_app::Release;
use tracing::{instrument, warn};

use crate::resolver::ReleaseResolver;
use crate::types::{Package, UpdateStatus};
use crate::version::{compare, Comparison};

/// A status and the release it was decided against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
	pub status: UpdateStatus,
	pub latest: Option<Release>,
}

pub struct UpdateDecisionEngine {
	resolver: Arc<ReleaseResolver>,
}

impl UpdateDecisionEngine {
	pub fn new(resolver: Arc<ReleaseResolver>) -> Self {
		Self { resolver }
	}

	pub async fn decide(&self, package: &Package) -> UpdateStatus {
		self.evaluate(package).await.status
	}

	/// Resolution failures become `UpdateStatus::Error`, never `UpToDate`.
	#[instrument(skip(self, package), fields(repo = %package.repo, channel = %package.channel))]
	pub async fn evaluate(&self, package: &Package) -> Decision {
		let Some(app) = &package.app_id else {
			return Decision {
				status: UpdateStatus::Unmanaged,
				latest: None,
			};
		};

		match self
			.resolver
			.resolve_latest(app, &package.repo, package.channel)
			.await
		{
			Ok(latest) => Decision {
				status: decide_against(package, latest.as_ref()),
				latest,
			},
			Err(e) => {
				warn!(error = %e, "Could not resolve latest release");
				Decision {
					status: UpdateStatus::Error(e.to_string()),
					latest: None,
				}
			}
		}
	}
}

/// The decision for a linked package given its resolved release.
pub fn decide_against(package: &Package, latest: Option<&Release>) -> UpdateStatus {
	let Some(latest) = latest else {
		return UpdateStatus::UpToDate;
	};

	match compare(&package.installed_version, &latest.tag_name) {
		Comparison::Older => UpdateStatus::UpdateAvailable,
		Comparison::Newer => UpdateStatus::RollbackAvailable,
		Comparison::Same => UpdateStatus::UpToDate,
		Comparison::Incomparable => {
			warn!(
				repo = %package.repo,
				installed = %package.installed_version,
				latest = %latest.tag_name,
				"Versions are not comparable, offering the release as an update"
			);
			UpdateStatus::UpdateAvailable
		}
	}
}
