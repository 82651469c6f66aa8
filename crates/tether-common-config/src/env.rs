// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Secret loading from the environment.
//!
//! The encryption key for stored App credentials is usually mounted as a file
//! (Docker/Kubernetes secrets), so every secret variable `VAR` may instead be
//! supplied as `VAR_FILE` pointing at a file holding the value.

use std::path::PathBuf;
use std::{env, fs};

use tether_common_secret::SecretString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Load `var`, preferring `{var}_FILE` when both are present.
///
/// One trailing newline is stripped from file contents. Returns `Ok(None)`
/// when neither variable is set.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path_str) = env::var(&file_var) {
		if path_str.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(path_str);
		let content = fs::read_to_string(&path).map_err(|source| SecretEnvError::Io {
			path: path.clone(),
			source,
		})?;

		let value = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(SecretString::new(value)));
	}

	Ok(env::var(var).ok().map(SecretString::new))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn reads_direct_value() {
		env::set_var("TETHER_TEST_DIRECT_SECRET", "plain-value");
		let secret = load_secret_env("TETHER_TEST_DIRECT_SECRET").unwrap().unwrap();
		assert_eq!(secret.expose(), "plain-value");
		env::remove_var("TETHER_TEST_DIRECT_SECRET");
	}

	#[test]
	fn file_variant_wins_and_strips_newline() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "from-file").unwrap();

		env::set_var("TETHER_TEST_FILE_SECRET", "from-env");
		env::set_var("TETHER_TEST_FILE_SECRET_FILE", file.path());

		let secret = load_secret_env("TETHER_TEST_FILE_SECRET").unwrap().unwrap();
		assert_eq!(secret.expose(), "from-file");

		env::remove_var("TETHER_TEST_FILE_SECRET");
		env::remove_var("TETHER_TEST_FILE_SECRET_FILE");
	}

	#[test]
	fn empty_file_path_is_rejected() {
		env::set_var("TETHER_TEST_EMPTY_PATH_FILE", "");
		let err = load_secret_env("TETHER_TEST_EMPTY_PATH").unwrap_err();
		assert!(matches!(err, SecretEnvError::EmptyPath { .. }));
		env::remove_var("TETHER_TEST_EMPTY_PATH_FILE");
	}

	#[test]
	fn unset_secret_is_none() {
		assert!(load_secret_env("TETHER_TEST_NEVER_SET").unwrap().is_none());
	}
}
