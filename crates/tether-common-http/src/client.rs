// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use reqwest::{Client, ClientBuilder};

/// Client builder pre-populated with the Tether User-Agent.
///
/// GitHub rejects API requests without a User-Agent, so every client in the
/// workspace is created through here.
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// `tether/{crate version}/{os}-{arch}`
pub fn user_agent() -> String {
	format!(
		"tether/{}/{}-{}",
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH
	)
}
