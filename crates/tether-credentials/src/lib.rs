// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! GitHub App credentials, encrypted at rest in host option storage.

pub mod app;
pub mod cipher;
pub mod error;
pub mod options;
pub mod store;

pub use app::{App, AppStatus};
pub use cipher::Cipher;
pub use error::{CredentialError, StoreError};
pub use options::{MemoryOptionStore, OptionStore, SqliteOptionStore};
pub use store::{CredentialStore, ManifestCredentials, APPS_OPTION};
