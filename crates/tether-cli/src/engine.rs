// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Builds the package service from resolved configuration.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tether_cache::{Cache, MemoryCache};
use tether_common_secret::SecretString;
use tether_config::TetherConfig;
use tether_credentials::{Cipher, CredentialStore, OptionStore, SqliteOptionStore};
use tether_github_app::{GithubApiConfig, RepositoryApi, RepositoryClient, RetryConfig, TokenProvider, TokenSource};
use tether_packages::{EngineSettings, InvalidationHandler, PackageService, ServiceDeps};
use tracing::info;

use crate::host::{DirectoryInstaller, InventoryHost};

pub fn github_api_config(config: &TetherConfig) -> Result<GithubApiConfig> {
	let mut api = GithubApiConfig::new(&config.github.api_base_url).context("invalid github.api_base_url")?;
	api.request_timeout = std::time::Duration::from_secs(config.github.request_timeout_secs);
	api.download_timeout = config.operations.deadline();
	api.retry_config = RetryConfig {
		max_attempts: config.github.retry_max_attempts,
		..RetryConfig::default()
	};
	api.listing_cap = config.matching.listing_cap;
	api.max_download_bytes = config.operations.max_download_bytes;
	api.token_skew = config.cache.token_skew();
	api.backoff = config.cache.backoff();
	Ok(api)
}

pub fn engine_settings(config: &TetherConfig) -> EngineSettings {
	EngineSettings {
		release_ttl: config.cache.release_ttl(),
		repository_ttl: config.cache.repository_ttl(),
		auto_discovery_max_apps: config.matching.auto_discovery_max_apps,
		operation_deadline: config.operations.deadline(),
		aggregate_deadline: config.operations.aggregate_deadline(),
		journal_capacity: config.operations.journal_capacity,
		..EngineSettings::default()
	}
}

pub fn cipher(key: Option<&SecretString>) -> Result<Cipher> {
	let key = key.filter(|k| !k.is_empty()).context(
		"storage.encryption_key is not set; generate one with `tether keygen` and export TETHER_STORAGE_ENCRYPTION_KEY",
	)?;
	Cipher::from_base64(key.expose()).context("storage.encryption_key is invalid")
}

/// Option storage and the credential store on top of it.
pub async fn open_storage(config: &TetherConfig) -> Result<(Arc<dyn OptionStore>, Arc<CredentialStore>)> {
	let cipher = cipher(config.storage.encryption_key.as_ref())?;
	let options: Arc<dyn OptionStore> = Arc::new(
		SqliteOptionStore::connect(&config.storage.database_url)
			.await
			.context("failed to open option storage")?,
	);
	let credentials = Arc::new(CredentialStore::new(Arc::clone(&options), cipher));
	Ok((options, credentials))
}

pub async fn build(
	config: &TetherConfig,
	inventory: &Path,
	install_dir: &Path,
) -> Result<(PackageService, InvalidationHandler)> {
	let (options, credentials) = open_storage(config).await?;
	let api = github_api_config(config)?;
	let http = api.http_client()?;
	let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());

	let tokens: Arc<dyn TokenSource> = Arc::new(TokenProvider::new(
		http.clone(),
		api.clone(),
		Arc::clone(&credentials),
		Arc::clone(&cache),
	));
	let repos: Arc<dyn RepositoryApi> = Arc::new(RepositoryClient::new(http, api, tokens, Arc::clone(&cache)));

	info!(
		inventory = %inventory.display(),
		install_dir = %install_dir.display(),
		"Package engine ready"
	);

	Ok(PackageService::new(
		ServiceDeps {
			host: Arc::new(InventoryHost::new(inventory)),
			installer: Arc::new(DirectoryInstaller::new(install_dir)),
			repos,
			credentials,
			options,
			cache,
		},
		engine_settings(config),
	))
}
