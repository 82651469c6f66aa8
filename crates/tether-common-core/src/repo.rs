// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `owner/name` repository slugs.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepoSlugError {
	#[error("repository slug is empty")]
	Empty,

	#[error("repository slug '{0}' must have the form owner/name")]
	Shape(String),

	#[error("repository slug '{slug}' contains invalid character {ch:?}")]
	InvalidChar { slug: String, ch: char },
}

/// A GitHub repository slug, normalized to lowercase.
///
/// Both halves are one or more of `[A-Za-z0-9_.-]`, so two slugs compare
/// equal exactly when GitHub would treat them as the same repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RepoSlug(String);

impl RepoSlug {
	pub fn parse(input: &str) -> Result<Self, RepoSlugError> {
		let trimmed = input.trim();
		if trimmed.is_empty() {
			return Err(RepoSlugError::Empty);
		}

		let (owner, name) = trimmed
			.split_once('/')
			.ok_or_else(|| RepoSlugError::Shape(trimmed.to_string()))?;

		if owner.is_empty() || name.is_empty() || name.contains('/') {
			return Err(RepoSlugError::Shape(trimmed.to_string()));
		}

		if let Some(ch) = owner.chars().chain(name.chars()).find(|c| !is_slug_char(*c)) {
			return Err(RepoSlugError::InvalidChar {
				slug: trimmed.to_string(),
				ch,
			});
		}

		Ok(Self(trimmed.to_ascii_lowercase()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn owner(&self) -> &str {
		self.0.split_once('/').map(|(owner, _)| owner).unwrap_or_default()
	}

	pub fn name(&self) -> &str {
		self.0.split_once('/').map(|(_, name)| name).unwrap_or_default()
	}
}

fn is_slug_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

impl fmt::Display for RepoSlug {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for RepoSlug {
	type Err = RepoSlugError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl<'de> Deserialize<'de> for RepoSlug {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		Self::parse(&raw).map_err(serde::de::Error::custom)
	}
}
