// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! File-backed host collaborators: a JSON inventory of installed packages and
//! an installer that drops archives into a directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use tether_packages::{HostError, HostPackages, InstallError, InstalledPackage, PackageInstaller, PackageKind};
use tracing::info;

#[derive(Debug, Default, Deserialize)]
struct Inventory {
	#[serde(default)]
	plugins: Vec<InstalledPackage>,
	#[serde(default)]
	themes: Vec<InstalledPackage>,
}

/// Reads `{"plugins": [...], "themes": [...]}` on every call.
pub struct InventoryHost {
	path: PathBuf,
}

impl InventoryHost {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	fn load(&self) -> Result<Inventory, HostError> {
		let raw = std::fs::read_to_string(&self.path)
			.map_err(|e| HostError(format!("cannot read {}: {e}", self.path.display())))?;
		serde_json::from_str(&raw).map_err(|e| HostError(format!("invalid inventory {}: {e}", self.path.display())))
	}
}

impl HostPackages for InventoryHost {
	fn list_installed_plugins(&self) -> Result<Vec<InstalledPackage>, HostError> {
		Ok(self.load()?.plugins)
	}

	fn list_installed_themes(&self) -> Result<Vec<InstalledPackage>, HostError> {
		Ok(self.load()?.themes)
	}
}

/// Writes archives to `{root}/{plugins|themes}/{slug}.zip`, replacing any
/// previous archive in one rename.
pub struct DirectoryInstaller {
	root: PathBuf,
}

impl DirectoryInstaller {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn archive_path(&self, kind: PackageKind, slug: &str) -> PathBuf {
		self.root.join(format!("{kind}s")).join(format!("{slug}.zip"))
	}
}

fn valid_slug(slug: &str) -> bool {
	!slug.is_empty()
		&& slug != "."
		&& slug != ".."
		&& !slug.contains(|c: char| c == '/' || c == '\\')
		&& Path::new(slug).components().count() == 1
}

#[async_trait]
impl PackageInstaller for DirectoryInstaller {
	async fn install_package_archive(
		&self,
		kind: PackageKind,
		slug: &str,
		archive: Bytes,
	) -> Result<(), InstallError> {
		if !valid_slug(slug) {
			return Err(InstallError(format!("refusing to install into slug '{slug}'")));
		}

		let target = self.archive_path(kind, slug);
		let dir = target
			.parent()
			.ok_or_else(|| InstallError(format!("no parent directory for {}", target.display())))?;
		tokio::fs::create_dir_all(dir)
			.await
			.map_err(|e| InstallError(format!("cannot create {}: {e}", dir.display())))?;

		let partial = target.with_extension("zip.partial");
		tokio::fs::write(&partial, &archive)
			.await
			.map_err(|e| InstallError(format!("cannot write {}: {e}", partial.display())))?;
		tokio::fs::rename(&partial, &target)
			.await
			.map_err(|e| InstallError(format!("cannot replace {}: {e}", target.display())))?;

		info!(%kind, slug, bytes = archive.len(), path = %target.display(), "Archive installed");
		Ok(())
	}
}
