// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Package discovery, App matching, release resolution, update decisions and
//! install/rollback for plugins and themes that update from GitHub.

pub mod coordinator;
pub mod decision;
pub mod discovery;
pub mod error;
pub mod events;
pub mod host;
pub mod journal;
pub mod matcher;
pub mod preferences;
pub mod resolver;
pub mod service;
pub mod settings;
pub mod types;
pub mod version;

pub use coordinator::{PackageOperationCoordinator, RepoLocks};
pub use decision::{Decision, UpdateDecisionEngine};
pub use discovery::PackageDiscovery;
pub use error::{ConfigError, EventError, OpError, PackageError, ResolveError};
pub use events::{event_channel, EventSender, InvalidationHandler, TrustedDelivery, WebhookEvent};
pub use host::{HostError, HostPackages, InstallError, InstalledPackage, PackageInstaller};
pub use journal::{OperationJournal, OperationKind, OperationRecord, OperationState};
pub use matcher::AppMatcher;
pub use preferences::ChannelPreferences;
pub use resolver::ReleaseResolver;
pub use service::{PackageService, ServiceDeps};
pub use settings::EngineSettings;
pub use types::{Package, PackageKind, PackageView, ReleaseChannel, UpdateStatus};
