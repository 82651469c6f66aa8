// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::Cache;

const MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone)]
struct CacheEntry {
	value: serde_json::Value,
	expires_at: Instant,
	last_used: Instant,
}

/// Process-local [`Cache`] backed by a single mutex-guarded map.
///
/// Expiry uses `tokio::time::Instant`, so tests can drive TTLs with a paused
/// clock.
#[derive(Debug)]
pub struct MemoryCache {
	entries: Mutex<HashMap<String, CacheEntry>>,
	max_entries: usize,
}

impl Default for MemoryCache {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryCache {
	pub fn new() -> Self {
		Self::with_max_entries(MAX_ENTRIES)
	}

	pub fn with_max_entries(max_entries: usize) -> Self {
		Self {
			entries: Mutex::new(HashMap::new()),
			max_entries: max_entries.max(1),
		}
	}

	/// Number of stored entries, expired ones included.
	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
		// The map is always left consistent, so a poisoned lock is still usable.
		self.entries.lock().unwrap_or_else(|e| e.into_inner())
	}
}

fn evict_lru(entries: &mut HashMap<String, CacheEntry>) {
	let oldest = entries
		.iter()
		.min_by_key(|(_, entry)| entry.last_used)
		.map(|(key, _)| key.clone());

	if let Some(key) = oldest {
		trace!(key = %key, "evicting least recently used cache entry");
		entries.remove(&key);
	}
}

impl Cache for MemoryCache {
	fn get(&self, key: &str) -> Option<serde_json::Value> {
		let now = Instant::now();
		let mut entries = self.lock();

		match entries.get_mut(key) {
			Some(entry) if entry.expires_at > now => {
				entry.last_used = now;
				return Some(entry.value.clone());
			}
			Some(_) => {}
			None => return None,
		}

		entries.remove(key);
		trace!(key, "cache entry expired");
		None
	}

	fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) {
		if ttl.is_zero() {
			self.invalidate(key);
			return;
		}

		let now = Instant::now();
		let mut entries = self.lock();

		if !entries.contains_key(key) && entries.len() >= self.max_entries {
			entries.retain(|_, entry| entry.expires_at > now);
			if entries.len() >= self.max_entries {
				evict_lru(&mut entries);
			}
		}

		entries.insert(
			key.to_string(),
			CacheEntry {
				value,
				expires_at: now + ttl,
				last_used: now,
			},
		);
	}

	fn invalidate(&self, key: &str) -> bool {
		let now = Instant::now();
		let removed = self.lock().remove(key);
		let live = removed.is_some_and(|entry| entry.expires_at > now);
		if live {
			debug!(key, "cache entry invalidated");
		}
		live
	}

	fn invalidate_prefix(&self, prefix: &str) -> usize {
		let mut entries = self.lock();
		let before = entries.len();
		entries.retain(|key, _| !key.starts_with(prefix));
		let removed = before - entries.len();
		if removed > 0 {
			debug!(prefix, removed, "cache prefix invalidated");
		}
		removed
	}
}
