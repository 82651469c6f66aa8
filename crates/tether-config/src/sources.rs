// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, TOML files and the environment.

use std::path::PathBuf;
use std::str::FromStr;

use tether_common_config::load_secret_env;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::TetherConfigLayer;
use crate::sections::{
	CacheConfigLayer, GithubConfigLayer, LogFormat, LoggingConfigLayer, MatchingConfigLayer,
	OperationsConfigLayer, StorageConfigLayer,
};

pub const SYSTEM_CONFIG_PATH: &str = "/etc/tether/tether.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<TetherConfigLayer, ConfigError>;
}

/// Built-in defaults source. Section defaults are applied at finalize time,
/// so this contributes an empty layer.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<TetherConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(TetherConfigLayer::default())
	}
}

pub struct TomlSource {
	path: PathBuf,
	required: bool,
}

impl TomlSource {
	/// A file that must exist.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: true,
		}
	}

	/// The system-wide file, skipped when absent.
	pub fn system() -> Self {
		Self {
			path: PathBuf::from(SYSTEM_CONFIG_PATH),
			required: false,
		}
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<TetherConfigLayer, ConfigError> {
		if !self.required && !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(TetherConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: TetherConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: TETHER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<TetherConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(TetherConfigLayer {
			github: Some(load_github_from_env()?),
			cache: Some(load_cache_from_env()?),
			operations: Some(load_operations_from_env()?),
			matching: Some(load_matching_from_env()?),
			storage: Some(load_storage_from_env()?),
			logging: Some(load_logging_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_github_from_env() -> Result<GithubConfigLayer, ConfigError> {
	Ok(GithubConfigLayer {
		api_base_url: env_var("TETHER_GITHUB_API_BASE_URL"),
		request_timeout_secs: env_parse("TETHER_GITHUB_REQUEST_TIMEOUT_SECS")?,
		retry_max_attempts: env_parse("TETHER_GITHUB_RETRY_MAX_ATTEMPTS")?,
	})
}

fn load_cache_from_env() -> Result<CacheConfigLayer, ConfigError> {
	Ok(CacheConfigLayer {
		release_ttl_secs: env_parse("TETHER_CACHE_RELEASE_TTL_SECS")?,
		repository_ttl_secs: env_parse("TETHER_CACHE_REPOSITORY_TTL_SECS")?,
		token_skew_secs: env_parse("TETHER_CACHE_TOKEN_SKEW_SECS")?,
		backoff_secs: env_parse("TETHER_CACHE_BACKOFF_SECS")?,
	})
}

fn load_operations_from_env() -> Result<OperationsConfigLayer, ConfigError> {
	Ok(OperationsConfigLayer {
		deadline_secs: env_parse("TETHER_OPERATIONS_DEADLINE_SECS")?,
		aggregate_deadline_secs: env_parse("TETHER_OPERATIONS_AGGREGATE_DEADLINE_SECS")?,
		max_download_bytes: env_parse("TETHER_OPERATIONS_MAX_DOWNLOAD_BYTES")?,
		journal_capacity: env_parse("TETHER_OPERATIONS_JOURNAL_CAPACITY")?,
	})
}

fn load_matching_from_env() -> Result<MatchingConfigLayer, ConfigError> {
	Ok(MatchingConfigLayer {
		auto_discovery_max_apps: env_parse("TETHER_MATCHING_AUTO_DISCOVERY_MAX_APPS")?,
		listing_cap: env_parse("TETHER_MATCHING_LISTING_CAP")?,
	})
}

fn load_storage_from_env() -> Result<StorageConfigLayer, ConfigError> {
	Ok(StorageConfigLayer {
		database_url: env_var("TETHER_STORAGE_DATABASE_URL"),
		encryption_key: load_secret_env("TETHER_STORAGE_ENCRYPTION_KEY")
			.map_err(|e| ConfigError::Secret(e.to_string()))?,
	})
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = match env_var("TETHER_LOG_FORMAT") {
		Some(v) => Some(
			v.parse::<LogFormat>()
				.map_err(|message| ConfigError::InvalidValue {
					key: "TETHER_LOG_FORMAT".to_string(),
					message,
				})?,
		),
		None => None,
	};

	Ok(LoggingConfigLayer {
		level: env_var("TETHER_LOG_LEVEL"),
		format,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}

	#[test]
	fn test_missing_system_file_is_skipped() {
		let source = TomlSource {
			path: PathBuf::from("/nonexistent/tether.toml"),
			required: false,
		};
		let layer = source.load().unwrap();
		assert!(layer.github.is_none());
	}

	#[test]
	fn test_missing_explicit_file_is_an_error() {
		let source = TomlSource::new("/nonexistent/tether.toml");
		assert!(matches!(source.load(), Err(ConfigError::FileRead { .. })));
	}

	#[test]
	fn test_toml_file_parses() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[matching]\nauto_discovery_max_apps = 2").unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(layer.matching.unwrap().auto_discovery_max_apps, Some(2));
	}

	#[test]
	fn test_malformed_toml_reports_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[cache\nrelease_ttl_secs = ").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn test_env_parse_rejects_garbage() {
		std::env::set_var("TETHER_TEST_ENV_PARSE_GARBAGE", "ten");
		let result: Result<Option<u64>, _> = env_parse("TETHER_TEST_ENV_PARSE_GARBAGE");
		assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
		std::env::remove_var("TETHER_TEST_ENV_PARSE_GARBAGE");
	}

	#[test]
	fn test_env_parse_treats_empty_as_unset() {
		std::env::set_var("TETHER_TEST_ENV_PARSE_EMPTY", "");
		let result: Option<u64> = env_parse("TETHER_TEST_ENV_PARSE_EMPTY").unwrap();
		assert!(result.is_none());
		std::env::remove_var("TETHER_TEST_ENV_PARSE_EMPTY");
	}
}
