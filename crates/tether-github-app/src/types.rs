// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Release and repository types, plus the GitHub response shapes they are
//! read from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A published GitHub release of a package repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
	pub tag_name: String,
	pub name: String,
	pub html_url: String,
	/// API URL of the first `.zip` asset, else the source zipball.
	pub download_url: String,
	pub prerelease: bool,
	pub published_at: Option<DateTime<Utc>>,
}

/// Items collected from a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing<T> {
	pub items: Vec<T>,
	/// More pages existed past the collection cap.
	pub truncated: bool,
}

impl<T> Listing<T> {
	pub fn complete(items: Vec<T>) -> Self {
		Self {
			items,
			truncated: false,
		}
	}
}

impl<T> Default for Listing<T> {
	fn default() -> Self {
		Self::complete(Vec::new())
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitHubRelease {
	tag_name: String,
	#[serde(default)]
	name: Option<String>,
	#[serde(default)]
	html_url: String,
	#[serde(default)]
	draft: bool,
	#[serde(default)]
	prerelease: bool,
	#[serde(default)]
	published_at: Option<DateTime<Utc>>,
	#[serde(default)]
	zipball_url: Option<String>,
	#[serde(default)]
	assets: Vec<GitHubAsset>,
}

#[derive(Debug, Deserialize)]
struct GitHubAsset {
	name: String,
	url: String,
}

impl GitHubRelease {
	/// Drafts and releases with nothing to download are never offered.
	pub(crate) fn into_release(self) -> Option<Release> {
		if self.draft {
			return None;
		}

		let asset = self
			.assets
			.into_iter()
			.find(|a| a.name.to_ascii_lowercase().ends_with(".zip"))
			.map(|a| a.url);
		let download_url = asset.or(self.zipball_url)?;

		Some(Release {
			name: self.name.filter(|n| !n.is_empty()).unwrap_or_else(|| self.tag_name.clone()),
			tag_name: self.tag_name,
			html_url: self.html_url,
			download_url,
			prerelease: self.prerelease,
			published_at: self.published_at,
		})
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct InstallationRepositories {
	#[serde(default)]
	pub repositories: Vec<GitHubRepository>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitHubRepository {
	pub full_name: String,
}
