// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! GitHub App access for Tether.
//!
//! Installation tokens are exchanged from App JWTs and cached per App;
//! repository and release listings, and release archive downloads, are made
//! with those tokens under a refresh-once policy.

pub mod client;
pub mod config;
pub mod error;
pub mod jwt;
pub mod policy;
pub mod token;
pub mod types;

pub use client::{RepositoryApi, RepositoryClient};
pub use config::GithubApiConfig;
pub use error::{ApiError, AuthError};
pub use jwt::{AppClaims, JwtSigner, Rs256Signer};
pub use policy::AuthRetryPolicy;
pub use tether_common_http::RetryConfig;
pub use token::{InstallationToken, TokenProvider, TokenSource};
pub use types::{Listing, Release};
