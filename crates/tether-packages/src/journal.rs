// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded history of install and rollback operations.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tether_common_core::{AppId, RepoSlug};
use uuid::Uuid;

use crate::types::{Package, PackageKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
	Install,
	Rollback,
}

impl fmt::Display for OperationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OperationKind::Install => write!(f, "install"),
			OperationKind::Rollback => write!(f, "rollback"),
		}
	}
}

/// Idle → Resolving → Downloading → Installing → Done | Failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum OperationState {
	#[default]
	Idle,
	Resolving,
	Downloading,
	Installing,
	Done,
	Failed(String),
}

impl OperationState {
	pub fn is_terminal(&self) -> bool {
		matches!(self, OperationState::Done | OperationState::Failed(_))
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
	pub id: Uuid,
	pub kind: OperationKind,
	pub package_kind: PackageKind,
	pub slug: String,
	pub repo: RepoSlug,
	pub app_id: AppId,
	pub version: String,
	pub state: OperationState,
	/// Tag of the release that was installed.
	pub tag: Option<String>,
	pub started_at: DateTime<Utc>,
	pub finished_at: Option<DateTime<Utc>>,
}

impl OperationRecord {
	pub(crate) fn start(kind: OperationKind, package: &Package, app_id: AppId, version: &str) -> Self {
		Self {
			id: Uuid::new_v4(),
			kind,
			package_kind: package.kind,
			slug: package.slug.clone(),
			repo: package.repo.clone(),
			app_id,
			version: version.to_string(),
			state: OperationState::Idle,
			tag: None,
			started_at: Utc::now(),
			finished_at: None,
		}
	}

	pub(crate) fn finish(&mut self, state: OperationState) {
		self.state = state;
		self.finished_at = Some(Utc::now());
	}
}

/// Oldest records are dropped once `capacity` is reached.
#[derive(Debug)]
pub struct OperationJournal {
	records: Mutex<VecDeque<OperationRecord>>,
	capacity: usize,
}

impl OperationJournal {
	pub fn new(capacity: usize) -> Self {
		Self {
			records: Mutex::new(VecDeque::new()),
			capacity: capacity.max(1),
		}
	}

	pub fn record(&self, record: OperationRecord) {
		let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
		while records.len() >= self.capacity {
			records.pop_front();
		}
		records.push_back(record);
	}

	/// Newest first.
	pub fn recent(&self) -> Vec<OperationRecord> {
		let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
		records.iter().rev().cloned().collect()
	}
}
