// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-repository release channel choices, kept in host option storage.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tether_common_core::RepoSlug;
use tether_credentials::{OptionStore, StoreError};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::types::ReleaseChannel;

pub const CHANNELS_OPTION: &str = "tether_channels";

/// Repositories without an entry follow the stable channel.
pub struct ChannelPreferences {
	options: Arc<dyn OptionStore>,
	write_lock: Mutex<()>,
}

impl ChannelPreferences {
	pub fn new(options: Arc<dyn OptionStore>) -> Self {
		Self {
			options,
			write_lock: Mutex::new(()),
		}
	}

	pub async fn all(&self) -> Result<HashMap<RepoSlug, ReleaseChannel>, StoreError> {
		let Some(Value::Object(entries)) = self.options.get(CHANNELS_OPTION).await? else {
			return Ok(HashMap::new());
		};

		let mut channels = HashMap::new();
		for (repo, channel) in entries {
			let parsed = RepoSlug::parse(&repo)
				.ok()
				.zip(serde_json::from_value::<ReleaseChannel>(channel).ok());
			match parsed {
				Some((repo, channel)) => {
					channels.insert(repo, channel);
				}
				None => warn!(repo = %repo, "Skipping malformed channel preference"),
			}
		}
		Ok(channels)
	}

	pub async fn get(&self, repo: &RepoSlug) -> Result<ReleaseChannel, StoreError> {
		Ok(self.all().await?.remove(repo).unwrap_or_default())
	}

	/// Edits the stored object in place, so entries this version cannot read
	/// are written back unchanged.
	pub async fn set(&self, repo: &RepoSlug, channel: ReleaseChannel) -> Result<(), StoreError> {
		let _guard = self.write_lock.lock().await;
		let mut entries = match self.options.get(CHANNELS_OPTION).await? {
			Some(Value::Object(entries)) => entries,
			Some(other) => {
				warn!(value = %other, "Replacing channel preferences that are not an object");
				Map::new()
			}
			None => Map::new(),
		};

		entries.retain(|key, _| RepoSlug::parse(key).map_or(true, |parsed| &parsed != repo));
		if channel != ReleaseChannel::Stable {
			entries.insert(repo.to_string(), serde_json::to_value(channel)?);
		}

		self.options.put(CHANNELS_OPTION, Value::Object(entries)).await?;
		info!(repo = %repo, %channel, "Release channel set");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use tether_credentials::MemoryOptionStore;

	fn repo(s: &str) -> RepoSlug {
		RepoSlug::parse(s).unwrap()
	}

	#[tokio::test]
	async fn unknown_repositories_default_to_stable() {
		let prefs = ChannelPreferences::new(Arc::new(MemoryOptionStore::new()));
		assert_eq!(prefs.get(&repo("acme/widget")).await.unwrap(), ReleaseChannel::Stable);
	}

	#[tokio::test]
	async fn channels_persist_and_stable_clears_the_entry() {
		let options = Arc::new(MemoryOptionStore::new());
		let prefs = ChannelPreferences::new(options.clone());

		prefs.set(&repo("acme/widget"), ReleaseChannel::Beta).await.unwrap();
		prefs.set(&repo("acme/gadget"), ReleaseChannel::Alpha).await.unwrap();
		assert_eq!(prefs.get(&repo("Acme/Widget")).await.unwrap(), ReleaseChannel::Beta);

		prefs.set(&repo("acme/widget"), ReleaseChannel::Stable).await.unwrap();
		let stored = options.get(CHANNELS_OPTION).await.unwrap().unwrap();
		assert_eq!(stored, json!({ "acme/gadget": "alpha" }));
	}

	#[tokio::test]
	async fn malformed_entries_are_skipped() {
		let options = Arc::new(MemoryOptionStore::new());
		options
			.put(
				CHANNELS_OPTION,
				json!({ "acme/widget": "beta", "bad slug": "beta", "acme/gadget": "nightly" }),
			)
			.await
			.unwrap();

		let all = ChannelPreferences::new(options).all().await.unwrap();
		assert_eq!(all.len(), 1);
		assert_eq!(all[&repo("acme/widget")], ReleaseChannel::Beta);
	}
	#[tokio::test]
	async fn setting_a_channel_keeps_unreadable_entries() {
		let options = Arc::new(MemoryOptionStore::new());
		options
			.put(
				CHANNELS_OPTION,
				json!({ "Acme/Widget": "alpha", "bad slug": "beta", "acme/gadget": "nightly" }),
			)
			.await
			.unwrap();
		let prefs = ChannelPreferences::new(options.clone());

		prefs.set(&repo("acme/widget"), ReleaseChannel::Beta).await.unwrap();

		let stored = options.get(CHANNELS_OPTION).await.unwrap().unwrap();
		assert_eq!(
			stored,
			json!({ "acme/widget": "beta", "bad slug": "beta", "acme/gadget": "nightly" })
		);
	}
}
