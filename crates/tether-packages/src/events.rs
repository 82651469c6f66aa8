// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Webhook intake. Deliveries arrive already verified; they are parsed into
//! [`WebhookEvent`] and applied by a dedicated [`InvalidationHandler`] that
//! reads them off a channel.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tether_cache::{keys, Cache};
use tether_common_core::{AppId, RepoSlug};
use tether_credentials::{CredentialError, CredentialStore};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::error::EventError;

/// A verified webhook delivery for one of our Apps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustedDelivery {
	/// `X-GitHub-Event` header value.
	pub event: String,
	pub payload: Value,
	pub app_id: AppId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
	/// Any `release` action.
	ReleaseChanged {
		app_id: AppId,
		repo: RepoSlug,
		action: String,
	},
	/// Repositories were added to or removed from the installation.
	RepositoriesChanged { app_id: AppId },
	/// The installation was created or unsuspended.
	Installed { app_id: AppId, installation_id: u64 },
	Uninstalled { app_id: AppId },
	Suspended { app_id: AppId },
	/// New permissions were accepted, so both token and repository access may
	/// have changed.
	PermissionsChanged { app_id: AppId },
	Ping { app_id: AppId },
}

impl WebhookEvent {
	pub fn app_id(&self) -> &AppId {
		match self {
			WebhookEvent::ReleaseChanged { app_id, .. }
			| WebhookEvent::RepositoriesChanged { app_id }
			| WebhookEvent::Installed { app_id, .. }
			| WebhookEvent::Uninstalled { app_id }
			| WebhookEvent::Suspended { app_id }
			| WebhookEvent::PermissionsChanged { app_id }
			| WebhookEvent::Ping { app_id } => app_id,
		}
	}
}

impl TrustedDelivery {
	pub fn parse(&self) -> Result<WebhookEvent, EventError> {
		let app_id = self.app_id.clone();
		let action = self.payload.get("action").and_then(Value::as_str).unwrap_or_default();

		match self.event.as_str() {
			"release" => {
				let full_name = self
					.payload
					.pointer("/repository/full_name")
					.and_then(Value::as_str)
					.ok_or_else(|| self.missing("repository.full_name"))?;
				let repo = RepoSlug::parse(full_name).map_err(|source| EventError::InvalidRepository {
					event: self.event.clone(),
					source,
				})?;
				Ok(WebhookEvent::ReleaseChanged {
					app_id,
					repo,
					action: action.to_string(),
				})
			}
			"installation_repositories" => Ok(WebhookEvent::RepositoriesChanged { app_id }),
			"installation" => match action {
				"created" | "unsuspend" => {
					let installation_id = self
						.payload
						.pointer("/installation/id")
						.and_then(Value::as_u64)
						.filter(|id| *id != 0)
						.ok_or_else(|| self.missing("installation.id"))?;
					Ok(WebhookEvent::Installed {
						app_id,
						installation_id,
					})
				}
				"deleted" => Ok(WebhookEvent::Uninstalled { app_id }),
				"suspend" => Ok(WebhookEvent::Suspended { app_id }),
				"new_permissions_accepted" => Ok(WebhookEvent::PermissionsChanged { app_id }),
				other => Err(EventError::Unsupported(format!("installation.{other}"))),
			},
			"ping" => Ok(WebhookEvent::Ping { app_id }),
			other => Err(EventError::Unsupported(other.to_string())),
		}
	}

	fn missing(&self, field: &'static str) -> EventError {
		EventError::MissingField {
			event: self.event.clone(),
			field,
		}
	}
}

/// Drop every cache entry tied to an App and the releases of its repositories.
pub(crate) fn purge_app_caches(cache: &dyn Cache, app_id: &AppId, repos: &[RepoSlug]) {
	for key in keys::app_scoped(app_id.as_str()) {
		cache.invalidate(&key);
	}
	for repo in repos {
		cache.invalidate(&keys::releases(repo.as_str()));
	}
	info!(app_id = %app_id, repos = repos.len(), "Purged App caches");
}

#[derive(Clone)]
pub struct EventSender {
	tx: mpsc::Sender<WebhookEvent>,
}

impl EventSender {
	pub async fn send(&self, event: WebhookEvent) -> Result<(), EventError> {
		self.tx.send(event).await.map_err(|_| EventError::ChannelClosed)
	}
}

/// Applies webhook events to the cache and the credential store.
pub struct InvalidationHandler {
	rx: mpsc::Receiver<WebhookEvent>,
	cache: Arc<dyn Cache>,
	credentials: Arc<CredentialStore>,
}

pub fn event_channel(
	capacity: usize,
	cache: Arc<dyn Cache>,
	credentials: Arc<CredentialStore>,
) -> (EventSender, InvalidationHandler) {
	let (tx, rx) = mpsc::channel(capacity.max(1));
	(
		EventSender { tx },
		InvalidationHandler {
			rx,
			cache,
			credentials,
		},
	)
}

impl InvalidationHandler {
	/// Apply events until every sender is dropped.
	pub async fn run(mut self) {
		while let Some(event) = self.rx.recv().await {
			if let Err(e) = self.apply(&event).await {
				warn!(app_id = %event.app_id(), error = %e, "Failed to apply webhook event");
			}
		}
		debug!("Event channel closed");
	}

	#[instrument(skip(self), fields(app_id = %event.app_id()))]
	pub async fn apply(&self, event: &WebhookEvent) -> Result<(), CredentialError> {
		match event {
			WebhookEvent::ReleaseChanged { repo, action, .. } => {
				let removed = self.cache.invalidate(&keys::releases(repo.as_str()));
				info!(repo = %repo, action, removed, "Release changed");
			}
			WebhookEvent::RepositoriesChanged { app_id } => {
				self.cache.invalidate(&keys::repositories(app_id.as_str()));
				info!("Installation repositories changed");
			}
			WebhookEvent::PermissionsChanged { app_id } => {
				self.cache.invalidate(&keys::token(app_id.as_str()));
				self.cache.invalidate(&keys::repositories(app_id.as_str()));
				info!("Installation permissions changed");
			}
			WebhookEvent::Installed {
				app_id,
				installation_id,
			} => {
				self.credentials.mark_installed(app_id, *installation_id).await?;
				self.cache.invalidate(&keys::token(app_id.as_str()));
				self.cache.invalidate(&keys::repositories(app_id.as_str()));
			}
			WebhookEvent::Uninstalled { app_id } => {
				let repos = match self.credentials.mark_uninstalled(app_id).await {
					Ok(app) => app.managed_repositories,
					Err(CredentialError::NotFound(_)) => {
						warn!("Uninstall event for an unknown App");
						Vec::new()
					}
					Err(e) => return Err(e),
				};
				purge_app_caches(self.cache.as_ref(), app_id, &repos);
			}
			WebhookEvent::Suspended { app_id } => {
				self.cache.invalidate(&keys::token(app_id.as_str()));
				self.credentials.mark_error(app_id).await?;
			}
			WebhookEvent::Ping { .. } => debug!("Ping"),
		}
		Ok(())
	}
}
