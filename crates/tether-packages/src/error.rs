// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use tether_common_core::{AppId, RepoSlug};
use tether_credentials::{CredentialError, StoreError};
use tether_github_app::ApiError;
use thiserror::Error;

use crate::host::{HostError, InstallError};

/// Bad data read from the host. Logged and skipped, never fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("{slug}: Update URI '{uri}' is not an owner/repo slug")]
	MalformedUpdateUri { slug: String, uri: String },

	#[error("unparsable version '{0}'")]
	UnparsableVersion(String),
}

#[derive(Debug, Error)]
pub enum ResolveError {
	#[error("could not fetch releases: {0}")]
	Api(#[from] ApiError),
}

impl ResolveError {
	pub fn is_auth(&self) -> bool {
		match self {
			ResolveError::Api(e) => is_auth_failure(e),
		}
	}

	pub fn is_timeout(&self) -> bool {
		matches!(self, ResolveError::Api(ApiError::Timeout))
	}
}

pub(crate) fn is_auth_failure(e: &ApiError) -> bool {
	matches!(e, ApiError::Auth(_)) || e.is_auth_rejection()
}

/// Install and rollback failures.
#[derive(Debug, Error)]
pub enum OpError {
	#[error("{repo} has no release tagged '{version}'")]
	VersionNotFound { repo: RepoSlug, version: String },

	#[error("download failed: {0}")]
	DownloadFailed(#[source] ApiError),

	#[error("host installer failed: {0}")]
	InstallFailed(#[source] InstallError),

	#[error("not authorized to update {repo}: {reason}")]
	Unauthorized { repo: RepoSlug, reason: String },

	#[error("an operation on {0} is already in progress")]
	OperationInProgress(RepoSlug),

	#[error("operation timed out")]
	Timeout,

	#[error(transparent)]
	Resolve(ResolveError),
}

#[derive(Debug, Error)]
pub enum EventError {
	#[error("unsupported event type '{0}'")]
	Unsupported(String),

	#[error("{event} payload is missing {field}")]
	MissingField { event: String, field: &'static str },

	#[error("{event} payload has an invalid repository: {source}")]
	InvalidRepository {
		event: String,
		#[source]
		source: tether_common_core::RepoSlugError,
	},

	#[error("event channel is closed")]
	ChannelClosed,
}

/// Failures of the package service surface.
#[derive(Debug, Error)]
pub enum PackageError {
	#[error("failed to read installed packages: {0}")]
	Host(#[from] HostError),

	#[error(transparent)]
	Credentials(#[from] CredentialError),

	#[error(transparent)]
	Store(#[from] StoreError),

	#[error(transparent)]
	Operation(#[from] OpError),

	#[error(transparent)]
	Event(#[from] EventError),

	#[error("no installed package uses {0}")]
	PackageNotFound(RepoSlug),

	#[error("{0} is used by both a plugin and a theme, name the kind to update")]
	AmbiguousPackage(RepoSlug),

	#[error("App {0} not found")]
	AppNotFound(AppId),

	#[error("package pass exceeded its deadline")]
	Timeout,
}

pub type Result<T, E = PackageError> = std::result::Result<T, E>;
