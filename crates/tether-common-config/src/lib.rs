// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Configuration primitives shared by Tether crates.
//!
//! - [`Secret`] / [`SecretString`] re-exported from `tether-common-secret`
//! - [`load_secret_env`] for `VAR` / `VAR_FILE` secret loading

pub mod env;

pub use tether_common_secret::{Secret, SecretString, REDACTED};

pub use env::{load_secret_env, SecretEnvError};
