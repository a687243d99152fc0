//! Local settings storage using SQLite

use crate::error::Result;
use crate::vibration::PreferenceStore;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

pub struct LocalStorage {
    conn: Mutex<Connection>,
}

impl LocalStorage {
    pub fn new(data_dir: &str) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = Path::new(data_dir).join("ringline.db");
        Self::from_connection(Connection::open(db_path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    // ========================================================================
    // Settings
    // ========================================================================

    pub fn save_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn delete_setting(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl PreferenceStore for LocalStorage {
    fn preference(&self, key: &str) -> Option<String> {
        match self.get_setting(key) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Failed to read setting {}: {}", key, e);
                None
            }
        }
    }

    fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        self.save_setting(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vibration::VIBRATION_PATTERN_KEY;

    #[test]
    fn test_settings_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();

        {
            let storage = LocalStorage::new(path).unwrap();
            storage.save_setting(VIBRATION_PATTERN_KEY, "heartbeat").unwrap();
        }

        let storage = LocalStorage::new(path).unwrap();
        assert_eq!(storage.preference(VIBRATION_PATTERN_KEY).as_deref(), Some("heartbeat"));
    }

    #[test]
    fn test_missing_and_deleted_settings() {
        let storage = LocalStorage::in_memory().unwrap();
        assert_eq!(storage.get_setting("absent").unwrap(), None);

        storage.set_preference("k", "v1").unwrap();
        storage.set_preference("k", "v2").unwrap();
        assert_eq!(storage.get_setting("k").unwrap().as_deref(), Some("v2"));

        storage.delete_setting("k").unwrap();
        assert_eq!(storage.preference("k"), None);
    }
}
