// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Host collaborators: the installed package inventory and the archive
//! installer.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::PackageKind;

/// Header metadata of one installed plugin or theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
	pub slug: String,
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub version: String,
	#[serde(default)]
	pub update_uri: Option<String>,
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct HostError(pub String);

#[derive(Debug, Error)]
#[error("{0}")]
pub struct InstallError(pub String);

/// Local reads of the host's installed packages.
pub trait HostPackages: Send + Sync {
	fn list_installed_plugins(&self) -> Result<Vec<InstalledPackage>, HostError>;
	fn list_installed_themes(&self) -> Result<Vec<InstalledPackage>, HostError>;
}

/// Replaces an installed package with the contents of a release archive.
#[async_trait]
pub trait PackageInstaller: Send + Sync {
	async fn install_package_archive(
		&self,
		kind: PackageKind,
		slug: &str,
		archive: Bytes,
	) -> Result<(), InstallError>;
}
