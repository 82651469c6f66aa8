// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cache key layout.
//!
//! | key                     | value                         |
//! |-------------------------|-------------------------------|
//! | `releases:{owner/repo}` | release list, newest first    |
//! | `token:{app id}`        | installation access token     |
//! | `repositories:{app id}` | repositories the app can read |
//! | `backoff:{app id}`      | rate-limit marker             |

pub const RELEASES_PREFIX: &str = "releases:";
pub const TOKEN_PREFIX: &str = "token:";
pub const REPOSITORIES_PREFIX: &str = "repositories:";
pub const BACKOFF_PREFIX: &str = "backoff:";

pub fn releases(repo_slug: &str) -> String {
	format!("{RELEASES_PREFIX}{}", repo_slug.to_ascii_lowercase())
}

pub fn token(app_id: &str) -> String {
	format!("{TOKEN_PREFIX}{app_id}")
}

pub fn repositories(app_id: &str) -> String {
	format!("{REPOSITORIES_PREFIX}{app_id}")
}

pub fn backoff(app_id: &str) -> String {
	format!("{BACKOFF_PREFIX}{app_id}")
}

/// Every key scoped to a single app.
pub fn app_scoped(app_id: &str) -> [String; 3] {
	[token(app_id), repositories(app_id), backoff(app_id)]
}
