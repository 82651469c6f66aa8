// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Package and update status types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tether_common_core::{AppId, RepoSlug};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageKind {
	Plugin,
	Theme,
}

impl fmt::Display for PackageKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PackageKind::Plugin => write!(f, "plugin"),
			PackageKind::Theme => write!(f, "theme"),
		}
	}
}

impl FromStr for PackageKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"plugin" => Ok(PackageKind::Plugin),
			"theme" => Ok(PackageKind::Theme),
			_ => Err(format!("Invalid package kind: {s}")),
		}
	}
}

/// Which releases a package follows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseChannel {
	#[default]
	Stable,
	Beta,
	Alpha,
	Develop,
}

impl ReleaseChannel {
	/// Substring a prerelease tag must contain to belong to this channel.
	/// `None` for stable, which takes full releases only.
	pub fn tag_token(&self) -> Option<&'static str> {
		match self {
			ReleaseChannel::Stable => None,
			ReleaseChannel::Beta => Some("beta"),
			ReleaseChannel::Alpha => Some("alpha"),
			ReleaseChannel::Develop => Some("develop"),
		}
	}
}

impl fmt::Display for ReleaseChannel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ReleaseChannel::Stable => write!(f, "stable"),
			ReleaseChannel::Beta => write!(f, "beta"),
			ReleaseChannel::Alpha => write!(f, "alpha"),
			ReleaseChannel::Develop => write!(f, "develop"),
		}
	}
}

impl FromStr for ReleaseChannel {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"stable" => Ok(ReleaseChannel::Stable),
			"beta" => Ok(ReleaseChannel::Beta),
			"alpha" => Ok(ReleaseChannel::Alpha),
			"develop" => Ok(ReleaseChannel::Develop),
			_ => Err(format!("Invalid release channel: {s}")),
		}
	}
}

/// An installed plugin or theme whose Update URI names a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Package {
	pub slug: String,
	pub kind: PackageKind,
	pub name: String,
	pub repo: RepoSlug,
	/// Empty when the host reports no version.
	pub installed_version: String,
	/// Managing App. `None` means unlinked: no automatic updates.
	pub app_id: Option<AppId>,
	pub channel: ReleaseChannel,
}

impl Package {
	pub fn is_linked(&self) -> bool {
		self.app_id.is_some()
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum UpdateStatus {
	UpToDate,
	UpdateAvailable,
	RollbackAvailable,
	Unmanaged,
	Error(String),
}

impl fmt::Display for UpdateStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			UpdateStatus::UpToDate => write!(f, "up_to_date"),
			UpdateStatus::UpdateAvailable => write!(f, "update_available"),
			UpdateStatus::RollbackAvailable => write!(f, "rollback_available"),
			UpdateStatus::Unmanaged => write!(f, "unmanaged"),
			UpdateStatus::Error(reason) => write!(f, "error: {reason}"),
		}
	}
}

/// One row of the package listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageView {
	pub slug: String,
	pub kind: PackageKind,
	pub name: String,
	pub repo: RepoSlug,
	pub installed_version: String,
	pub status: UpdateStatus,
	pub channel: ReleaseChannel,
	pub app_id: Option<AppId>,
	/// Tag of the release the status was decided against.
	pub latest_version: Option<String>,
}
