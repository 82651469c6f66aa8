// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for Tether.
//!
//! Sources, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. TOML file (`/etc/tether/tether.toml`, or an explicit `--config` path)
//! 3. Environment variables (`TETHER_*`)
//!
//! ```ignore
//! let config = tether_config::load_config()?;
//! println!("GitHub API at {}", config.github.api_base_url);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::TetherConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct TetherConfig {
	pub github: GithubConfig,
	pub cache: CacheConfig,
	pub operations: OperationsConfig,
	pub matching: MatchingConfig,
	pub storage: StorageConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from the system file and the environment.
pub fn load_config() -> Result<TetherConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with an explicit config file, which must exist.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<TetherConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<TetherConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = TetherConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Resolve a merged layer, applying defaults and validation.
pub fn finalize(layer: TetherConfigLayer) -> Result<TetherConfig, ConfigError> {
	let github = layer.github.unwrap_or_default().finalize()?;
	let cache = layer.cache.unwrap_or_default().finalize();
	let operations = layer.operations.unwrap_or_default().finalize()?;
	let matching = layer.matching.unwrap_or_default().finalize();
	let storage = layer.storage.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&github, &operations)?;

	info!(
		api_base_url = %github.api_base_url,
		request_timeout_secs = github.request_timeout_secs,
		release_ttl_secs = cache.release_ttl_secs,
		operation_deadline_secs = operations.deadline_secs,
		auto_discovery_max_apps = matching.auto_discovery_max_apps,
		database = %storage.database_url,
		encryption_key_configured = storage.encryption_key.is_some(),
		"Tether configuration loaded"
	);

	Ok(TetherConfig {
		github,
		cache,
		operations,
		matching,
		storage,
		logging,
	})
}

/// Cross-section rules.
fn validate_config(github: &GithubConfig, operations: &OperationsConfig) -> Result<(), ConfigError> {
	if github.request_timeout_secs > operations.deadline_secs {
		return Err(ConfigError::Validation(format!(
			"github.request_timeout_secs ({}) exceeds operations.deadline_secs ({})",
			github.request_timeout_secs, operations.deadline_secs
		)));
	}

	Ok(())
}
