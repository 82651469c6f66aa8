// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for Tether.

pub mod cache;
pub mod github;
pub mod logging;
pub mod matching;
pub mod operations;
pub mod storage;

pub use cache::{CacheConfig, CacheConfigLayer};
pub use github::{GithubConfig, GithubConfigLayer, DEFAULT_API_BASE_URL};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use matching::{MatchingConfig, MatchingConfigLayer};
pub use operations::{OperationsConfig, OperationsConfigLayer};
pub use storage::{StorageConfig, StorageConfigLayer};
