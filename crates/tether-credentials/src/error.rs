// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use tether_common_core::AppId;

use crate::app::AppStatus;

/// Failures of the host option storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
	#[error(transparent)]
	Store(#[from] StoreError),

	#[error("Encryption key is invalid: {0}")]
	InvalidKey(String),

	#[error("Encryption failed: {0}")]
	Encryption(String),

	#[error("Decryption failed: {0}")]
	Decryption(String),

	#[error("Invalid app record: {0}")]
	Invalid(String),

	#[error("App not found: {0}")]
	NotFound(AppId),

	#[error("App {id} cannot move from {from} to {to}")]
	InvalidTransition {
		id: AppId,
		from: AppStatus,
		to: AppStatus,
	},
}

impl From<serde_json::Error> for CredentialError {
	fn from(e: serde_json::Error) -> Self {
		CredentialError::Store(StoreError::Serialization(e))
	}
}

pub type Result<T> = std::result::Result<T, CredentialError>;
