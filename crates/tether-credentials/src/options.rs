// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Host key-value option storage.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use sqlx::Row;
use tokio::sync::RwLock;

use crate::error::StoreError;

/// Named JSON values, one per option. Writes replace the whole value.
#[async_trait]
pub trait OptionStore: Send + Sync {
	async fn get(&self, name: &str) -> Result<Option<serde_json::Value>, StoreError>;
	async fn put(&self, name: &str, value: serde_json::Value) -> Result<(), StoreError>;
	/// Returns whether the option existed.
	async fn delete(&self, name: &str) -> Result<bool, StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryOptionStore {
	options: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryOptionStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl OptionStore for MemoryOptionStore {
	async fn get(&self, name: &str) -> Result<Option<serde_json::Value>, StoreError> {
		Ok(self.options.read().await.get(name).cloned())
	}

	async fn put(&self, name: &str, value: serde_json::Value) -> Result<(), StoreError> {
		self.options.write().await.insert(name.to_string(), value);
		Ok(())
	}

	async fn delete(&self, name: &str) -> Result<bool, StoreError> {
		Ok(self.options.write().await.remove(name).is_some())
	}
}

/// Options persisted in a single SQLite table.
#[derive(Clone)]
pub struct SqliteOptionStore {
	pool: SqlitePool,
}

impl SqliteOptionStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Open (creating if needed) the database at `database_url` and ensure the
	/// options table exists.
	#[tracing::instrument(skip(database_url))]
	pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
		let options = SqliteConnectOptions::from_str(database_url)?
			.journal_mode(SqliteJournalMode::Wal)
			.synchronous(SqliteSynchronous::Normal)
			.create_if_missing(true);

		let pool = SqlitePool::connect_with(options).await?;
		let store = Self::new(pool);
		store.migrate().await?;

		tracing::debug!("option store ready");
		Ok(store)
	}

	pub async fn migrate(&self) -> Result<(), StoreError> {
		sqlx::query(
			r#"
			CREATE TABLE IF NOT EXISTS options (
				name TEXT PRIMARY KEY,
				value TEXT NOT NULL,
				updated_at TEXT NOT NULL
			)
			"#,
		)
		.execute(&self.pool)
		.await?;
		Ok(())
	}
}

#[async_trait]
impl OptionStore for SqliteOptionStore {
	#[tracing::instrument(skip(self))]
	async fn get(&self, name: &str) -> Result<Option<serde_json::Value>, StoreError> {
		let row = sqlx::query("SELECT value FROM options WHERE name = ?")
			.bind(name)
			.fetch_optional(&self.pool)
			.await?;

		match row {
			Some(row) => {
				let raw: String = row.try_get("value")?;
				Ok(Some(serde_json::from_str(&raw)?))
			}
			None => Ok(None),
		}
	}

	#[tracing::instrument(skip(self, value))]
	async fn put(&self, name: &str, value: serde_json::Value) -> Result<(), StoreError> {
		let raw = serde_json::to_string(&value)?;
		sqlx::query(
			r#"
			INSERT INTO options (name, value, updated_at) VALUES (?, ?, ?)
			ON CONFLICT(name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
			"#,
		)
		.bind(name)
		.bind(&raw)
		.bind(chrono::Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	async fn delete(&self, name: &str) -> Result<bool, StoreError> {
		let result = sqlx::query("DELETE FROM options WHERE name = ?")
			.bind(name)
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected() > 0)
	}
}
