// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Transient cache namespace for Tether.
//!
//! Values are stored as JSON so the same namespace can sit on top of host
//! transient storage. Every read and write for a single key is linearizable;
//! nothing is promised across keys.

pub mod keys;
pub mod memory;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

pub use memory::MemoryCache;

/// TTL cache contract shared by the token provider, repository client,
/// release resolver and the webhook invalidation handler.
pub trait Cache: Send + Sync {
	/// Fetch a live value. Expired entries are treated as a miss.
	fn get(&self, key: &str) -> Option<serde_json::Value>;

	/// Store `value` under `key` until `ttl` elapses.
	fn set(&self, key: &str, value: serde_json::Value, ttl: Duration);

	/// Remove `key`. Returns whether a live entry was removed.
	fn invalidate(&self, key: &str) -> bool;

	/// Remove every key starting with `prefix`. Returns the number removed.
	fn invalidate_prefix(&self, prefix: &str) -> usize;
}

/// Typed access on top of [`Cache`].
pub trait CacheExt {
	fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T>;
	fn set_as<T: Serialize>(&self, key: &str, value: &T, ttl: Duration);
}

impl<C: Cache + ?Sized> CacheExt for C {
	fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
		let value = self.get(key)?;
		match serde_json::from_value(value) {
			Ok(typed) => Some(typed),
			Err(e) => {
				// A shape change between releases must not poison the key forever.
				warn!(key, error = %e, "dropping undecodable cache entry");
				self.invalidate(key);
				None
			}
		}
	}

	fn set_as<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
		match serde_json::to_value(value) {
			Ok(json) => self.set(key, json, ttl),
			Err(e) => warn!(key, error = %e, "refusing to cache unserializable value"),
		}
	}
}
