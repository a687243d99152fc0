//! Database storage layer for Ringline Server

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use ringline_core::Platform;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;

use crate::models::DeviceRegistration;

/// Wake-up push targets keyed by user and platform.
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    async fn upsert_registration(&self, user_id: &str, platform: Platform, token: &str) -> anyhow::Result<()>;

    /// Every registration for a user, most recently updated first.
    async fn registrations_for_user(&self, user_id: &str) -> anyhow::Result<Vec<DeviceRegistration>>;

    /// The registration to wake for an incoming call: the latest one whose
    /// platform supports wake-up pushes, else the latest of any platform.
    async fn find_for_user(&self, user_id: &str) -> anyhow::Result<Option<DeviceRegistration>> {
        let registrations = self.registrations_for_user(user_id).await?;
        let wakeable = registrations
            .iter()
            .position(|r| r.platform().is_some_and(|p| p.supports_wake_up_push()));

        Ok(match wakeable {
            Some(index) => registrations.into_iter().nth(index),
            None => registrations.into_iter().next(),
        })
    }
}

pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_path: &str) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(database_path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect(&database_url)
            .await?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    /// Private in-memory database. A single connection keeps every query on
    /// the same database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS device_registrations (
                user_id TEXT NOT NULL,
                platform TEXT NOT NULL,
                token TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, platform)
            );

            CREATE INDEX IF NOT EXISTS idx_registrations_user ON device_registrations(user_id, updated_at);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn count_registrations(&self) -> anyhow::Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM device_registrations")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}

#[async_trait]
impl DeviceDirectory for Storage {
    async fn upsert_registration(&self, user_id: &str, platform: Platform, token: &str) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        sqlx::query(
            "INSERT INTO device_registrations (user_id, platform, token, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id, platform) DO UPDATE SET
                token = excluded.token,
                updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(platform.as_str())
        .bind(token)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn registrations_for_user(&self, user_id: &str) -> anyhow::Result<Vec<DeviceRegistration>> {
        let registrations = sqlx::query_as::<_, DeviceRegistration>(
            "SELECT user_id, platform, token, updated_at
             FROM device_registrations WHERE user_id = ?
             ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(registrations)
    }
}
