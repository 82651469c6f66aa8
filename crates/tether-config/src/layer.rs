// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration as produced by a single source.

use serde::{Deserialize, Serialize};

use crate::sections::{
	CacheConfigLayer, GithubConfigLayer, LoggingConfigLayer, MatchingConfigLayer,
	OperationsConfigLayer, StorageConfigLayer,
};

/// One source's view of the configuration; every section is optional so
/// layers can be merged in precedence order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TetherConfigLayer {
	#[serde(default)]
	pub github: Option<GithubConfigLayer>,
	#[serde(default)]
	pub cache: Option<CacheConfigLayer>,
	#[serde(default)]
	pub operations: Option<OperationsConfigLayer>,
	#[serde(default)]
	pub matching: Option<MatchingConfigLayer>,
	#[serde(default)]
	pub storage: Option<StorageConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl TetherConfigLayer {
	/// Merge `other` on top of `self`; values set in `other` win.
	pub fn merge(&mut self, other: TetherConfigLayer) {
		merge_option(&mut self.github, other.github, GithubConfigLayer::merge);
		merge_option(&mut self.cache, other.cache, CacheConfigLayer::merge);
		merge_option(
			&mut self.operations,
			other.operations,
			OperationsConfigLayer::merge,
		);
		merge_option(&mut self.matching, other.matching, MatchingConfigLayer::merge);
		merge_option(&mut self.storage, other.storage, StorageConfigLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}
