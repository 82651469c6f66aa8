// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Version parsing and ordering for installed versions and release tags.
//!
//! Tags are read leniently: a leading `v`/`V` is dropped and missing minor or
//! patch components are zero-filled, so `v1.2` reads as `1.2.0`.

use std::cmp::Ordering;

use semver::Version;
use tether_github_app::Release;

use crate::error::ConfigError;

/// Strip surrounding whitespace and one leading `v`/`V`.
pub fn normalize(raw: &str) -> &str {
	let trimmed = raw.trim();
	trimmed
		.strip_prefix('v')
		.or_else(|| trimmed.strip_prefix('V'))
		.unwrap_or(trimmed)
}

pub fn parse_version(raw: &str) -> Result<Version, ConfigError> {
	let normalized = normalize(raw);
	if let Ok(version) = Version::parse(normalized) {
		return Ok(version);
	}

	// Zero-fill the numeric core, keeping any pre-release/build suffix.
	let split = normalized.find(|c: char| c == '-' || c == '+').unwrap_or(normalized.len());
	let (core, suffix) = normalized.split_at(split);
	let parts: Vec<&str> = core.split('.').collect();
	if parts.is_empty()
		|| parts.len() > 3
		|| parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
	{
		return Err(ConfigError::UnparsableVersion(raw.to_string()));
	}

	let mut padded = parts.join(".");
	for _ in parts.len()..3 {
		padded.push_str(".0");
	}
	padded.push_str(suffix);

	Version::parse(&padded).map_err(|_| ConfigError::UnparsableVersion(raw.to_string()))
}

/// Installed version relative to a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
	Older,
	Same,
	Newer,
	/// At least one side is not a version and the strings differ.
	Incomparable,
}

pub fn compare(installed: &str, latest: &str) -> Comparison {
	match (parse_version(installed), parse_version(latest)) {
		(Ok(a), Ok(b)) => match a.cmp_precedence(&b) {
			Ordering::Less => Comparison::Older,
			Ordering::Equal => Comparison::Same,
			Ordering::Greater => Comparison::Newer,
		},
		_ if normalize(installed) == normalize(latest) => Comparison::Same,
		_ => Comparison::Incomparable,
	}
}

/// Newest first: valid versions by precedence, then unparsable tags by
/// publish time.
pub fn newest_first(a: &Release, b: &Release) -> Ordering {
	match (parse_version(&a.tag_name), parse_version(&b.tag_name)) {
		(Ok(va), Ok(vb)) => vb
			.cmp_precedence(&va)
			.then_with(|| b.published_at.cmp(&a.published_at)),
		(Ok(_), Err(_)) => Ordering::Less,
		(Err(_), Ok(_)) => Ordering::Greater,
		(Err(_), Err(_)) => b.published_at.cmp(&a.published_at),
	}
}

/// Whether `tag` names `version`, exactly or once a leading `v` is ignored.
pub fn tag_matches(tag: &str, version: &str) -> bool {
	tag == version || normalize(tag) == normalize(version)
}
