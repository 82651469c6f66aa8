// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod id;
pub mod repo;

pub use id::AppId;
pub use repo::{RepoSlug, RepoSlugError};
